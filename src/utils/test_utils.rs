#[cfg(test)]
use crate::core::app::{App, SessionContext};
#[cfg(test)]
use crate::core::chat_stream::RequestAuth;
#[cfg(test)]
use crate::core::config::{Settings, Transport};

#[cfg(test)]
pub fn test_settings(transport: Transport) -> Settings {
    Settings {
        endpoint: "http://proxy.test/api/completion".to_string(),
        model: "test-model".to_string(),
        transport,
        ..Settings::default()
    }
}

#[cfg(test)]
pub fn create_test_app() -> App {
    create_test_app_with(Transport::Proxy)
}

#[cfg(test)]
pub fn create_test_app_with(transport: Transport) -> App {
    let auth = match transport {
        Transport::Proxy => RequestAuth::None,
        Transport::OpenaiCompletions => RequestAuth::Bearer("test-key".to_string()),
    };
    App::new(SessionContext::new(test_settings(transport), auth))
}

#[cfg(test)]
pub const SAMPLE_STREAMED_REPLY: &str = "Here is a quick summary.\n\n## Steps\n\n1. Install the tool\n2. Run `diybot say hello`\n\n| option | meaning |\n|---|---|\n| --model | model name |\n\n```rust\nfn main() {\n    println!(\"hi\");\n}\n```\n\nThat should be all you need.";
