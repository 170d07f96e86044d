//! Prompt template for role-tagged dialogs.
//!
//! Each answered exchange is encoded as
//! `BOS "[INST] {user} [/INST] {assistant} " EOS` and the final user turn as
//! `BOS "[INST] {user} [/INST]"` with no EOS, so generation continues with
//! the assistant reply. A leading system turn is folded into the first user
//! turn between `B_SYS` and `E_SYS`. The same template must be used for any
//! data a model is tuned on.

use crate::dialog::Turn;

pub const B_INST: &str = "[INST]";
pub const E_INST: &str = "[/INST]";
pub const B_SYS: &str = "<<SYS>>\n";
pub const E_SYS: &str = "\n<</SYS>>\n\n";

/// Delimiters that may not appear inside turn content.
pub const SPECIAL_TAGS: [&str; 4] = [B_INST, E_INST, "<<SYS>>", "<</SYS>>"];

/// Reply returned in place of a generation for dialogs containing special tags.
pub const UNSAFE_ERROR: &str = "Error: special tags are not allowed as part of the prompt.";

/// Fold a system prompt into the user turn that follows it.
pub fn merge_system(system: &str, user: &str) -> String {
    format!("{}{}{}{}", B_SYS, system, E_SYS, user)
}

/// Text of an answered user/assistant exchange, without BOS/EOS.
pub fn answered_pair(user: &str, assistant: &str) -> String {
    format!("{} {} {} {} ", B_INST, user.trim(), E_INST, assistant.trim())
}

/// Text of the final, unanswered user turn, without BOS.
pub fn open_turn(user: &str) -> String {
    format!("{} {} {}", B_INST, user.trim(), E_INST)
}

/// Whether any turn of the dialog contains a template delimiter.
pub fn contains_special_tags(dialog: &[Turn]) -> bool {
    dialog
        .iter()
        .any(|turn| SPECIAL_TAGS.iter().any(|tag| turn.content().contains(tag)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapping() {
        assert_eq!(answered_pair(" hi ", "hello\n"), "[INST] hi [/INST] hello ");
        assert_eq!(open_turn("how are you? "), "[INST] how are you? [/INST]");
        assert_eq!(
            merge_system("be brief", "hi"),
            "<<SYS>>\nbe brief\n<</SYS>>\n\nhi"
        );
    }

    #[test]
    fn test_special_tags() {
        assert!(!contains_special_tags(&[Turn::user("plain text")]));
        assert!(contains_special_tags(&[Turn::user("a [INST] b")]));
        assert!(contains_special_tags(&[
            Turn::system("<</SYS>>"),
            Turn::user("x")
        ]));
    }
}
