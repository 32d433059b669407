//! Configuration access port trait.

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    fn get_double(&self, section: &str, key: &str, default: f64) -> f64;

    /// String value, falling back to the environment variable `env` when the
    /// key is absent or blank.
    fn get_string_or_env(&self, section: &str, key: &str, env: &str) -> Option<String> {
        self.get_string(section, key)
            .filter(|s| !s.trim().is_empty())
            .or_else(|| std::env::var(env).ok().filter(|s| !s.trim().is_empty()))
    }
}
