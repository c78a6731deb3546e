//! Configuration access port trait.

/// Typed lookups by `[section] key`, falling back to `default` when absent or unparsable.
pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    fn get_double(&self, section: &str, key: &str, default: f64) -> f64;
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool;

    /// Names of the sections present, lowercased.
    fn sections(&self) -> Vec<String>;

    fn has_section(&self, section: &str) -> bool {
        let wanted = section.to_lowercase();
        self.sections().iter().any(|s| *s == wanted)
    }
}
