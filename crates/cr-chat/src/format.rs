use cr_model::Tokenizer;

use crate::dialog::{Role, Turn};
use crate::template;

/// Turns a validated dialog into one flat prompt.
pub struct DialogFormatter<'a, T: Tokenizer + ?Sized> {
    tokenizer: &'a T,
}

impl<'a, T: Tokenizer + ?Sized> DialogFormatter<'a, T> {
    pub fn new(tokenizer: &'a T) -> Self {
        Self { tokenizer }
    }

    /// Encode a dialog that already passed `dialog::validate`.
    pub fn format(&self, dialog: &[Turn]) -> Vec<u32> {
        let bos = self.tokenizer.bos_id();
        let eos = self.tokenizer.eos_id();

        // Content of each user/assistant turn, system folded into the first user turn.
        let mut contents: Vec<String> = Vec::with_capacity(dialog.len());
        let mut pending_system: Option<&str> = None;
        for turn in dialog {
            match turn.role() {
                Role::System => pending_system = Some(turn.content()),
                Role::User => match pending_system.take() {
                    Some(system) => contents.push(template::merge_system(system, turn.content())),
                    None => contents.push(turn.content().to_string()),
                },
                Role::Assistant => contents.push(turn.content().to_string()),
            }
        }

        let mut tokens = Vec::new();
        let (last, pairs) = match contents.split_last() {
            Some(split) => split,
            None => return tokens,
        };

        for pair in pairs.chunks_exact(2) {
            tokens.push(bos);
            tokens.extend(self.tokenizer.encode(&template::answered_pair(&pair[0], &pair[1])));
            tokens.push(eos);
        }

        tokens.push(bos);
        tokens.extend(self.tokenizer.encode(&template::open_turn(last)));
        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cr_model::{BpeTokenizer, Vocab};

    /// Character-level vocabulary covering the template and test content.
    fn tokenizer() -> BpeTokenizer {
        let mut tokens: Vec<String> = vec!["<unk>".into(), "<s>".into(), "</s>".into()];
        for ch in " \n[]/<>?INSTYabcdefghijklmnopqrstuvwxyz".chars() {
            tokens.push(ch.to_string());
        }
        BpeTokenizer::new(Vocab::new(tokens, vec![], 1, 2).unwrap(), vec![])
    }

    #[test]
    fn test_single_user_turn() {
        let tok = tokenizer();
        let ids = DialogFormatter::new(&tok).format(&[Turn::user("hi")]);
        assert_eq!(ids[0], tok.bos_id());
        assert_ne!(*ids.last().unwrap(), tok.eos_id());
        assert_eq!(tok.decode(&ids).unwrap(), "[INST] hi [/INST]");
    }

    #[test]
    fn test_answered_pairs_are_closed_with_eos() {
        let tok = tokenizer();
        let dialog = [Turn::user("hi"), Turn::assistant("yo"), Turn::user("bye?")];
        let ids = DialogFormatter::new(&tok).format(&dialog);

        let bos_count = ids.iter().filter(|&&t| t == tok.bos_id()).count();
        let eos_count = ids.iter().filter(|&&t| t == tok.eos_id()).count();
        assert_eq!(bos_count, 2);
        assert_eq!(eos_count, 1);

        let eos_at = ids.iter().position(|&t| t == tok.eos_id()).unwrap();
        assert_eq!(tok.decode(&ids[..eos_at]).unwrap(), "[INST] hi [/INST] yo ");
        assert_eq!(tok.decode(&ids[eos_at..]).unwrap(), "[INST] bye? [/INST]");
    }

    #[test]
    fn test_system_merged_into_first_user_turn() {
        let tok = tokenizer();
        let dialog = [Turn::system("be brief"), Turn::user("hi")];
        let ids = DialogFormatter::new(&tok).format(&dialog);
        assert_eq!(
            tok.decode(&ids).unwrap(),
            "[INST] <<SYS>>\nbe brief\n<</SYS>>\n\nhi [/INST]"
        );
        assert_eq!(ids.iter().filter(|&&t| t == tok.bos_id()).count(), 1);
    }
}
