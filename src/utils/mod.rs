pub mod clipboard;
pub mod logging;
pub mod syntax;
#[cfg(test)]
pub mod test_utils;
pub mod url;
