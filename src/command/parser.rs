#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show every watched key with its value
    Get,
    /// Delete a watched key from the store
    Delete(String),
    WatchList,
    WatchAdd(String),
    WatchDelete(String),
    Help,
}

impl Command {
    /// Parses whitespace separated arguments. Anything unrecognised is `Help`.
    pub fn parse(text: &str) -> Self {
        let args: Vec<&str> = text.split_whitespace().collect();
        match args.as_slice() {
            ["get"] => Command::Get,
            ["delete", path] => Command::Delete(path.to_string()),
            ["watch", "list"] => Command::WatchList,
            ["watch", "add", path] => Command::WatchAdd(path.to_string()),
            ["watch", "delete", path] => Command::WatchDelete(path.to_string()),
            _ => Command::Help,
        }
    }
}

pub const USAGE: &str = "command list:
- get
- delete PATH
- watch list
- watch add PATH
- watch delete PATH
";
