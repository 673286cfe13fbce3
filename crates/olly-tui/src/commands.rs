//! Slash commands typed into the input line

use std::path::PathBuf;

pub const HELP: &str = "/new  /rename <name>  /delete  /clear  /export [path]  /search <query>  \
/models  /model <name>  /temperature <0-2>  /max-tokens <n>  /history <n>  /system <text>  \
/edit <#> <text>  /regen  /copy [#]  /copy-code [n]  /example <n>  /attach <path>  /theme  /help";

/// Starter prompts offered on an empty transcript
pub const EXAMPLE_PROMPTS: [&str; 4] = [
    "Explain quantum computing in simple terms",
    "What are the top 3 tourist attractions in Croatia?",
    "Write a short story in the style of Edgar Allan Poe",
    "Generate a Python script to organize files by extension",
];

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    New,
    Rename(String),
    Delete,
    Clear,
    Export(Option<PathBuf>),
    Search(String),
    Models,
    Model(String),
    Temperature(f32),
    MaxTokens(u32),
    History(usize),
    System(String),
    /// 1-based message number as shown in the transcript
    Edit { number: usize, content: String },
    Regenerate,
    /// Message number to copy; the latest reply when absent
    Copy(Option<usize>),
    /// Code block number within the latest reply; the first when absent
    CopyCode(Option<usize>),
    /// 1-based index into [`EXAMPLE_PROMPTS`]
    Example(usize),
    Attach(PathBuf),
    Theme,
    Help,
}

impl Command {
    /// Parse a line starting with `/`. Errors are user-facing notices.
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let body = line
            .strip_prefix('/')
            .ok_or_else(|| "Commands start with /".to_string())?;
        let (name, rest) = match body.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (body, ""),
        };

        let required = |what: &str| {
            if rest.is_empty() {
                Err(format!("Usage: /{} <{}>", name, what))
            } else {
                Ok(rest.to_string())
            }
        };

        let positive = |what: &str| {
            rest.parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| format!("Not a {} number: {}", what, rest))
        };
        let optional_number = |what: &str| {
            if rest.is_empty() {
                Ok(None)
            } else {
                positive(what).map(Some)
            }
        };

        match name {
            "new" => Ok(Command::New),
            "rename" => required("name").map(Command::Rename),
            "delete" => Ok(Command::Delete),
            "clear" => Ok(Command::Clear),
            "export" => Ok(Command::Export(
                (!rest.is_empty()).then(|| PathBuf::from(rest)),
            )),
            "search" => Ok(Command::Search(rest.to_string())),
            "models" => Ok(Command::Models),
            "model" => required("name").map(Command::Model),
            "temperature" => required("value")?
                .parse()
                .map(Command::Temperature)
                .map_err(|_| format!("Not a number: {}", rest)),
            "max-tokens" => required("count")?
                .parse()
                .map(Command::MaxTokens)
                .map_err(|_| format!("Not a positive integer: {}", rest)),
            "history" => required("count")?
                .parse()
                .map(Command::History)
                .map_err(|_| format!("Not a positive integer: {}", rest)),
            "system" => required("prompt").map(Command::System),
            "edit" => {
                let args = required("# text")?;
                let (number, content) = args
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| "Usage: /edit <#> <text>".to_string())?;
                let number = number
                    .parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| format!("Not a message number: {}", number))?;
                Ok(Command::Edit {
                    number,
                    content: content.trim().to_string(),
                })
            }
            "regen" => Ok(Command::Regenerate),
            "copy" => optional_number("message").map(Command::Copy),
            "copy-code" => optional_number("code block").map(Command::CopyCode),
            "example" => {
                required("n")?;
                positive("example")
                    .ok()
                    .filter(|n| *n <= EXAMPLE_PROMPTS.len())
                    .map(Command::Example)
                    .ok_or_else(|| format!("Examples are numbered 1-{}", EXAMPLE_PROMPTS.len()))
            }
            "attach" => required("path").map(|p| Command::Attach(PathBuf::from(p))),
            "theme" => Ok(Command::Theme),
            "help" => Ok(Command::Help),
            other => Err(format!("Unknown command /{}. Try /help", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_commands() {
        assert_eq!(Command::parse("/new"), Ok(Command::New));
        assert_eq!(Command::parse("  /regen  "), Ok(Command::Regenerate));
        assert_eq!(Command::parse("/theme"), Ok(Command::Theme));
    }

    #[test]
    fn test_argument_commands() {
        assert_eq!(
            Command::parse("/rename Trip Planning"),
            Ok(Command::Rename("Trip Planning".to_string()))
        );
        assert_eq!(Command::parse("/temperature 0.7"), Ok(Command::Temperature(0.7)));
        assert_eq!(Command::parse("/max-tokens 512"), Ok(Command::MaxTokens(512)));
        assert_eq!(Command::parse("/history 8"), Ok(Command::History(8)));
        assert_eq!(
            Command::parse("/attach notes.txt"),
            Ok(Command::Attach(PathBuf::from("notes.txt")))
        );
    }

    #[test]
    fn test_optional_arguments() {
        assert_eq!(Command::parse("/export"), Ok(Command::Export(None)));
        assert_eq!(
            Command::parse("/export /tmp/chat.md"),
            Ok(Command::Export(Some(PathBuf::from("/tmp/chat.md"))))
        );
        assert_eq!(Command::parse("/search"), Ok(Command::Search(String::new())));
    }

    #[test]
    fn test_edit() {
        assert_eq!(
            Command::parse("/edit 3 what about Porto?"),
            Ok(Command::Edit {
                number: 3,
                content: "what about Porto?".to_string(),
            })
        );
        assert!(Command::parse("/edit 0 text").is_err());
        assert!(Command::parse("/edit three text").is_err());
        assert!(Command::parse("/edit 3").is_err());
    }

    #[test]
    fn test_copy() {
        assert_eq!(Command::parse("/copy"), Ok(Command::Copy(None)));
        assert_eq!(Command::parse("/copy 2"), Ok(Command::Copy(Some(2))));
        assert_eq!(Command::parse("/copy-code"), Ok(Command::CopyCode(None)));
        assert_eq!(Command::parse("/copy-code 3"), Ok(Command::CopyCode(Some(3))));
        assert_eq!(
            Command::parse("/copy last"),
            Err("Not a message number: last".to_string())
        );
        assert!(Command::parse("/copy-code 0").is_err());
    }

    #[test]
    fn test_example() {
        assert_eq!(Command::parse("/example 1"), Ok(Command::Example(1)));
        assert_eq!(Command::parse("/example 4"), Ok(Command::Example(4)));
        assert_eq!(
            Command::parse("/example 5"),
            Err("Examples are numbered 1-4".to_string())
        );
        assert!(Command::parse("/example").is_err());
    }

    #[test]
    fn test_errors() {
        assert!(Command::parse("/rename").is_err());
        assert!(Command::parse("/max-tokens -1").is_err());
        assert!(Command::parse("/temperature warm").is_err());
        assert_eq!(
            Command::parse("/frobnicate"),
            Err("Unknown command /frobnicate. Try /help".to_string())
        );
    }
}
