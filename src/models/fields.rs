// Prompt field descriptors and the answers collected for them

use std::collections::BTreeMap;

/// One question put to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Unique key; also the key of the collected answer.
    pub name: &'static str,
    /// Prompt text shown to the operator
    pub description: &'static str,
    pub default: Option<String>,
    /// Regex the answer must match
    pub pattern: Option<&'static str>,
    /// Shown when `pattern` does not match
    pub message: Option<&'static str>,
    pub required: bool,
    /// Secrets: input is never echoed
    pub hidden: bool,
}

impl FieldDescriptor {
    pub fn new(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            default: None,
            pattern: None,
            message: None,
            required: false,
            hidden: false,
        }
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn pattern(mut self, pattern: &'static str, message: &'static str) -> Self {
        self.pattern = Some(pattern);
        self.message = Some(message);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }
}

/// Field name -> accepted value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Answers {
    values: BTreeMap<String, String>,
}

impl Answers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Removes and returns an answer; missing answers come back empty.
    pub fn take(&mut self, name: &str) -> String {
        self.values.remove(name).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Answers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut answers = Answers::new();
        for (k, v) in iter {
            answers.insert(k, v);
        }
        answers
    }
}

pub const BASE_URL: &str = "base_url";
pub const PORT: &str = "port";
pub const USE_PORT: &str = "use_port";
pub const SECRET: &str = "secret";
pub const REDIS_HOST: &str = "redis:host";
pub const REDIS_PORT: &str = "redis:port";
pub const REDIS_PASSWORD: &str = "redis:password";

pub const ADMIN_USERNAME: &str = "username";
pub const ADMIN_EMAIL: &str = "email";
pub const ADMIN_PASSWORD: &str = "password";

// 1..=65535, no leading zeros
const PORT_PATTERN: &str =
    r"^([1-9][0-9]{0,3}|[1-5][0-9]{4}|6[0-4][0-9]{3}|65[0-4][0-9]{2}|655[0-2][0-9]|6553[0-5])$";
const PORT_MESSAGE: &str = "Port must be a number between 1 and 65535";

/// Questions asked before any configuration is written.
///
/// The secret default is a fresh UUID on every call.
pub fn install_questions() -> Vec<FieldDescriptor> {
    vec![
        FieldDescriptor::new(BASE_URL, "URL of this installation")
            .default_value("http://localhost")
            .pattern(
                r"^https?://",
                "Base URL must begin with 'http://' or 'https://'",
            ),
        FieldDescriptor::new(PORT, "Port number of your forum")
            .default_value("4567")
            .pattern(PORT_PATTERN, PORT_MESSAGE),
        FieldDescriptor::new(USE_PORT, "Use a port number to access the forum?")
            .default_value("y")
            .pattern(r"(?i)^(y(es)?|no?)$", "Please enter 'yes' or 'no'"),
        FieldDescriptor::new(SECRET, "Please enter a forum secret")
            .default_value(uuid::Uuid::new_v4().to_string()),
        FieldDescriptor::new(REDIS_HOST, "Host IP or address of your Redis instance")
            .default_value("127.0.0.1"),
        FieldDescriptor::new(REDIS_PORT, "Host port of your Redis instance")
            .default_value("6379")
            .pattern(PORT_PATTERN, PORT_MESSAGE),
        FieldDescriptor::new(REDIS_PASSWORD, "Password of your Redis database").hidden(),
    ]
}

/// Questions asked when no administrator exists yet.
pub fn admin_questions() -> Vec<FieldDescriptor> {
    vec![
        FieldDescriptor::new(ADMIN_USERNAME, "Administrator username").required(),
        FieldDescriptor::new(ADMIN_EMAIL, "Administrator email address")
            .pattern(r"^.+@.+$", "Email address must contain an '@'")
            .required(),
        FieldDescriptor::new(ADMIN_PASSWORD, "Password")
            .required()
            .hidden(),
    ]
}
