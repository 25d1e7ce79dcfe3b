#[cfg(test)]
mod tests {
    use crate::cli::{Cli, Command};
    use clap::Parser;
    use std::path::PathBuf;

    #[test]
    fn test_cli_verbose_quiet_conflict() {
        let result = Cli::try_parse_from(["pie", "--verbose", "--quiet", "pack"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_serve_args_defaults() {
        let args = Cli::try_parse_from(["pie", "serve"]).unwrap();

        if let Command::Serve(serve) = args.command {
            assert!(serve.port.is_none());
            assert!(serve.project.dir.is_none());
            assert!(serve.project.config.is_none());
        } else {
            panic!("Expected Serve command");
        }
    }

    #[test]
    fn test_serve_args_overrides() {
        let args = Cli::try_parse_from([
            "pie", "serve", "--dir", "work", "--config", "alt.json", "--port", "4100",
        ])
        .unwrap();

        if let Command::Serve(serve) = args.command {
            assert_eq!(serve.port, Some(4100));
            assert_eq!(serve.project.dir, Some(PathBuf::from("work")));
            assert_eq!(serve.project.config, Some(PathBuf::from("alt.json")));
        } else {
            panic!("Expected Serve command");
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Cli::try_parse_from(["pie", "clean", "-d", "work", "--no-color"]).unwrap();
        assert!(args.no_color);
        assert!(matches!(args.command, Command::Clean(_)));
    }

    #[test]
    fn test_invalid_port_rejected() {
        assert!(Cli::try_parse_from(["pie", "serve", "--port", "70000"]).is_err());
    }
}
