use clap::{builder::ValueParser, Arg, Command};

// Accepts either a numeric verbosity (0..=5) or a level name.
pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            // Successfully parsed as a number
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new("verbosity")
            .short('v')
            .long("verbose")
            .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
            .env("SESAMO_LOG_LEVEL")
            .global(true)
            .action(clap::ArgAction::Count)
            .value_parser(validator_log_level()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validator_accepts_names_and_numbers() {
        for (level, expected) in [("error", 0), ("warn", 1), ("info", 2), ("3", 3)] {
            temp_env::with_vars([("SESAMO_LOG_LEVEL", Some(level))], || {
                let command = with_args(Command::new("test"));
                let matches = command.get_matches_from(vec!["test"]);
                assert_eq!(matches.get_one::<u8>("verbosity").copied(), Some(expected));
            });
        }
    }

    #[test]
    fn test_validator_rejects_garbage() {
        temp_env::with_vars([("SESAMO_LOG_LEVEL", Some("loud"))], || {
            let command = with_args(Command::new("test"));
            let result = command.try_get_matches_from(vec!["test"]);
            assert!(result.is_err());
        });
    }
}
