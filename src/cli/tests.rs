use super::*;
use std::io::Cursor;

fn parse_args(argv: &[&str]) -> Args {
    Args::try_parse_from(argv)
        .unwrap_or_else(|err| panic!("argv={argv:?} should parse successfully: {err}"))
}

#[test]
fn no_subcommand_means_chat() {
    let args = parse_args(&["diybot"]);
    assert!(args.command.is_none());
    assert!(args.log.is_none());
}

#[test]
fn global_flags_feed_the_overrides() {
    let argv = [
        "diybot",
        "say",
        "-m",
        "text-curie-001",
        "--transport",
        "openai",
        "--endpoint",
        "http://localhost:4000/api/completion",
        "hello",
    ];
    let args = parse_args(&argv);
    assert_eq!(
        args.overrides(),
        SettingsOverrides {
            endpoint: Some("http://localhost:4000/api/completion".to_string()),
            model: Some("text-curie-001".to_string()),
            transport: Some(Transport::OpenaiCompletions),
        }
    );
}

#[test]
fn unknown_transport_is_rejected() {
    assert!(Args::try_parse_from(["diybot", "--transport", "carrier-pigeon"]).is_err());
}

#[test]
fn say_collects_the_whole_prompt() {
    let argv = ["diybot", "say", "--typewriter", "what", "is", "-1", "squared?"];
    match parse_args(&argv).command {
        Some(Commands::Say { typewriter, prompt }) => {
            assert!(typewriter);
            assert_eq!(prompt.join(" "), "what is -1 squared?");
        }
        _ => panic!("expected say subcommand for argv={argv:?}"),
    }
}

#[test]
fn say_requires_a_prompt() {
    assert!(Args::try_parse_from(["diybot", "say"]).is_err());
}

#[test]
fn auth_set_takes_an_optional_key() {
    match parse_args(&["diybot", "auth", "set", "--openai"]).command {
        Some(Commands::Auth {
            command: AuthCommands::Set { key, openai },
        }) => {
            assert!(key.is_none());
            assert!(openai);
        }
        _ => panic!("expected auth set"),
    }
    match parse_args(&["diybot", "auth", "set", "abc"]).command {
        Some(Commands::Auth {
            command: AuthCommands::Set { key, openai },
        }) => {
            assert_eq!(key.as_deref(), Some("abc"));
            assert!(!openai);
        }
        _ => panic!("expected auth set"),
    }
}

#[test]
fn config_set_joins_multi_word_values() {
    match parse_args(&["diybot", "config", "set", "display-name", "Helpful", "Bot"]).command {
        Some(Commands::Config {
            command: ConfigCommands::Set { key, value },
        }) => {
            assert_eq!(key, "display-name");
            assert_eq!(value.join(" "), "Helpful Bot");
        }
        _ => panic!("expected config set"),
    }
}

#[test]
fn log_flag_is_global() {
    let args = parse_args(&["diybot", "chat", "--log", "/tmp/diybot.log"]);
    assert_eq!(args.log, Some(PathBuf::from("/tmp/diybot.log")));
}

#[test]
fn secret_line_is_trimmed() {
    let secret = read_secret_line(Cursor::new("  sk-test \n")).expect("read");
    assert_eq!(secret, "sk-test");
}

#[test]
fn credential_status_never_prints_the_secret() {
    let line = describe_credential(
        CredentialKind::OpenAiToken,
        Some(("sk-secret".to_string(), CredentialSource::Environment)),
    );
    assert_eq!(line, "OpenAI API key: from environment");
    assert_eq!(
        describe_credential(CredentialKind::ProxyAuthKey, None),
        "proxy auth key: not set"
    );
}

#[test]
fn openai_transport_needs_a_token() {
    let manager = AuthManager::new_with_keyring(false);
    let settings = Settings {
        transport: Transport::OpenaiCompletions,
        ..Settings::default()
    };
    // Only meaningful when the environment has no key.
    if std::env::var(crate::auth::OPENAI_KEY_ENV).is_err() {
        assert!(resolve_auth(&manager, &settings).is_err());
    }
}
