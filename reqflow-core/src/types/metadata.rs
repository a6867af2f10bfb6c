/// Source location and display name of a region.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct Symbol {
    pub name: String,
    pub start_line: usize,
    pub end_line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisableSpec {
    Always,
    /// Disabled when the condition holds for the current variables.
    When(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopSpec {
    Count(usize),
    ForOf { item: String, variable: String },
    While(String),
}

impl LoopSpec {
    /// Parses `for <count>`, `for <item> of <variable>` or `while <condition>`.
    pub fn parse(spec: &str) -> Option<Self> {
        let spec = spec.trim();
        if let Some(rest) = spec.strip_prefix("while ") {
            let cond = rest.trim();
            return (!cond.is_empty()).then(|| LoopSpec::While(cond.to_string()));
        }
        let rest = spec.strip_prefix("for ")?.trim();
        let parts: Vec<&str> = rest.split_whitespace().collect();
        match parts.as_slice() {
            [count] => count.parse().ok().map(LoopSpec::Count),
            [item, "of", variable] => Some(LoopSpec::ForOf {
                item: (*item).to_string(),
                variable: (*variable).to_string(),
            }),
            _ => None,
        }
    }
}

/// Ordered `@key value` entries of a region. Keys may repeat.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct Metadata(Vec<(String, String)>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push((key.into(), value.into()));
    }

    /// Replaces every entry with this key.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        self.0.retain(|(k, _)| *k != key);
        self.0.push((key, value.into()));
    }

    pub fn remove(&mut self, key: &str) {
        self.0.retain(|(k, _)| k != key);
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.iter().any(|(k, _)| k == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn name(&self) -> Option<&str> {
        self.get("name").filter(|n| !n.is_empty())
    }

    pub fn title(&self) -> Option<&str> {
        self.get("title").filter(|t| !t.is_empty())
    }

    pub fn no_log(&self) -> bool {
        self.contains("noLog")
    }

    /// Referenced region names paired with whether the reference is forced.
    pub fn refs(&self) -> Vec<(String, bool)> {
        self.0
            .iter()
            .filter_map(|(k, v)| match k.as_str() {
                "ref" => Some((v.trim().to_string(), false)),
                "forceRef" => Some((v.trim().to_string(), true)),
                _ => None,
            })
            .filter(|(name, _)| !name.is_empty())
            .collect()
    }

    pub fn disabled(&self) -> Option<DisableSpec> {
        let value = self.get("disabled")?.trim();
        if value.is_empty() || value == "true" {
            Some(DisableSpec::Always)
        } else if value == "false" {
            None
        } else {
            Some(DisableSpec::When(value.to_string()))
        }
    }

    pub fn loop_spec(&self) -> Option<LoopSpec> {
        self.get("loop").and_then(LoopSpec::parse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_loop_specs() {
        assert_eq!(LoopSpec::parse("for 3"), Some(LoopSpec::Count(3)));
        assert_eq!(
            LoopSpec::parse("for user of users"),
            Some(LoopSpec::ForOf {
                item: "user".into(),
                variable: "users".into()
            })
        );
        assert_eq!(
            LoopSpec::parse("while {{count}} < 3"),
            Some(LoopSpec::While("{{count}} < 3".into()))
        );
        assert_eq!(LoopSpec::parse("for -1"), None);
        assert_eq!(LoopSpec::parse("repeat 3"), None);
    }

    #[test]
    fn disabled_variants() {
        let mut m = Metadata::new();
        assert_eq!(m.disabled(), None);
        m.set("disabled", "");
        assert_eq!(m.disabled(), Some(DisableSpec::Always));
        m.set("disabled", "{{skip}} == true");
        assert_eq!(m.disabled(), Some(DisableSpec::When("{{skip}} == true".into())));
    }

    #[test]
    fn refs_keep_declaration_order() {
        let mut m = Metadata::new();
        m.push("ref", "login");
        m.push("forceRef", "token");
        assert_eq!(
            m.refs(),
            vec![("login".to_string(), false), ("token".to_string(), true)]
        );
    }
}
