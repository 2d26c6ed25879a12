use std::collections::BTreeMap;

/// An ordered list of form fields using Stripe's bracketed key convention for nested values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormParams(Vec<(String, String)>);

impl FormParams {
    pub fn push<K: Into<String>, V: AsRef<str>>(&mut self, key: K, value: V) -> &mut Self {
        self.0.push((key.into(), value.as_ref().to_string()));
        self
    }

    /// Adds `prefix[key]=value` for every metadata entry.
    pub fn push_metadata(&mut self, prefix: &str, metadata: &BTreeMap<String, String>) -> &mut Self {
        for (k, v) in metadata {
            self.0.push((format!("{prefix}[{k}]"), v.clone()));
        }
        self
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.0
    }

    pub fn into_pairs(self) -> Vec<(String, String)> {
        self.0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn metadata_uses_bracketed_keys() {
        let mut md = BTreeMap::new();
        md.insert("session_ref".to_string(), "abc".to_string());
        md.insert("item_count".to_string(), "2".to_string());
        let mut params = FormParams::default();
        params.push("mode", "payment").push_metadata("metadata", &md);
        assert_eq!(params.pairs()[0], ("mode".to_string(), "payment".to_string()));
        assert_eq!(params.pairs()[1], ("metadata[item_count]".to_string(), "2".to_string()));
        assert_eq!(params.pairs()[2], ("metadata[session_ref]".to_string(), "abc".to_string()));
    }
}
