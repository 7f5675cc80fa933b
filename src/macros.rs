/// Lazily compiled regex for patterns that are fixed at build time.
///
/// Rule patterns come from files and go through `CompiledPattern` instead.
macro_rules! regex {
    ($pat:literal) => {{
        static RE: once_cell::sync::Lazy<regex::Regex> =
            once_cell::sync::Lazy::new(|| regex::Regex::new($pat).unwrap());
        &*RE
    }};
}
