//! Decides whether the trigger is offered for the focused interaction.

use trigger_core::types::{TaskRecord, TELEPHONY_MEDIA_TYPE};

/// The trigger is shown only while a telephony interaction is selected.
pub fn should_show(selected: Option<&TaskRecord>) -> bool {
    selected.and_then(TaskRecord::media_type) == Some(TELEPHONY_MEDIA_TYPE)
}
