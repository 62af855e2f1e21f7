//! The append-only record of human/assistant turns.
//!
//! The backing file is plain text with one `Human: ` or `Assistant: ` line
//! per turn, oldest first. Lines are only ever appended.

use std::fmt::{self, Display};
use std::io;
use std::path::{Path, PathBuf};

use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::Error;

/// Who said a turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// The person asking.
    Human,
    /// The agent answering.
    Assistant,
}

impl Role {
    fn prefix(self) -> &'static str {
        match self {
            Role::Human => "Human: ",
            Role::Assistant => "Assistant: ",
        }
    }

    fn strip(line: &str) -> Option<(Role, &str)> {
        if let Some(text) = line.strip_prefix("Human: ") {
            return Some((Role::Human, text));
        }
        // `AI: ` is accepted for hand-written histories.
        line.strip_prefix("Assistant: ")
            .or_else(|| line.strip_prefix("AI: "))
            .map(|text| (Role::Assistant, text))
    }
}

/// A single turn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Turn {
    /// Who said it.
    pub role: Role,
    /// What was said. May span several lines.
    pub text: String,
}

/// An ordered sequence of turns.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Transcript {
    /// Turns in chronological order.
    pub turns: Vec<Turn>,
}

impl Transcript {
    /// Parses transcript text.
    ///
    /// Lines without a role prefix continue the previous turn. Such lines
    /// before the first turn are dropped.
    pub fn parse(text: &str) -> Self {
        let mut turns: Vec<Turn> = vec![];
        for line in text.lines() {
            if let Some((role, text)) = Role::strip(line) {
                turns.push(Turn {
                    role,
                    text: text.to_owned(),
                });
            } else if let Some(last) = turns.last_mut() {
                last.text.push('\n');
                last.text.push_str(line);
            } else {
                trace!("dropping leading transcript line: {line:?}");
            }
        }
        Self { turns }
    }
}

impl Display for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for turn in &self.turns {
            writeln!(f, "{}{}", turn.role.prefix(), turn.text)?;
        }
        Ok(())
    }
}

/// File-backed transcript storage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranscriptStore {
    path: PathBuf,
}

impl TranscriptStore {
    /// Creates a store backed by the file at `path`. The file does not
    /// need to exist.
    #[inline]
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Returns the path of the backing file.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the whole transcript text.
    ///
    /// A missing or unreadable file yields empty text.
    pub async fn load(&self) -> String {
        match fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => String::new(),
            Err(err) => {
                warn!(
                    "failed to read transcript {}: {err}",
                    self.path.display()
                );
                String::new()
            }
        }
    }

    /// Appends one human turn and one assistant turn.
    pub async fn append(
        &self,
        human: &str,
        assistant: &str,
    ) -> Result<(), Error> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        let lines = format!(
            "{}{human}\n{}{assistant}\n",
            Role::Human.prefix(),
            Role::Assistant.prefix()
        );
        file.write_all(lines.as_bytes()).await?;
        file.flush().await?;
        debug!("appended a turn pair to {}", self.path.display());
        Ok(())
    }

    /// Truncates the backing file.
    pub async fn clear(&self) -> Result<(), Error> {
        let opened = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&self.path)
            .await;
        match opened {
            Ok(_) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = TranscriptStore::new(dir.path().join("history.txt"));
        assert_eq!(store.load().await, "");
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_append_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.txt");
        std::fs::write(&path, "Human: Hi! My name is Bob\n").unwrap();
        let store = TranscriptStore::new(&path);

        store.append("Who am I?", "Your name is Bob.").await.unwrap();
        let text = store.load().await;
        assert_eq!(
            text,
            "Human: Hi! My name is Bob\nHuman: Who am I?\nAssistant: Your name is Bob.\n"
        );
        assert_eq!(store.load().await, text);

        store.clear().await.unwrap();
        assert_eq!(store.load().await, "");
    }

    #[tokio::test]
    async fn test_append_failure() {
        let dir = tempfile::tempdir().unwrap();
        let store = TranscriptStore::new(dir.path().join("missing").join("h.txt"));
        let err = store.append("a", "b").await.unwrap_err();
        assert!(matches!(err, Error::TranscriptIo(_)));
    }

    #[test]
    fn test_parse() {
        let transcript = Transcript::parse(
            "preamble\nHuman: Hi! My name is Bob\nAI: Hello Bob!\nNice to meet you\nAssistant: Bye",
        );
        assert_eq!(
            transcript.turns,
            vec![
                Turn {
                    role: Role::Human,
                    text: "Hi! My name is Bob".to_owned()
                },
                Turn {
                    role: Role::Assistant,
                    text: "Hello Bob!\nNice to meet you".to_owned()
                },
                Turn {
                    role: Role::Assistant,
                    text: "Bye".to_owned()
                },
            ]
        );
        assert_eq!(
            transcript.to_string(),
            "Human: Hi! My name is Bob\nAssistant: Hello Bob!\nNice to meet you\nAssistant: Bye\n"
        );
    }
}
