//! CLI argument parsing and validation.

mod args;
mod batch;

pub use args::{Args, Command, ConfigAction, ExtractArgs, LongSynthArgs, SayArgs};
pub use batch::{BatchEntry, BatchOutcome, BatchParseError, exit_status, parse_batch, run_batch};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LauncherConfig;
    use clap::Parser;
    use std::path::PathBuf;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("openvoice-launcher").chain(argv.iter().copied()))
            .unwrap()
    }

    // ===========================================
    // Argument parsing
    // ===========================================

    #[test]
    fn test_parse_install_defaults() {
        let args = parse(&["install"]);

        match args.command {
            Command::Install { dir, save_config } => {
                assert_eq!(dir, PathBuf::from("."));
                assert!(!save_config);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_say_with_defaults() {
        let args = parse(&["say", "--text", "Hello there", "--voice", "alice"]);

        let Command::Say(say) = args.command else {
            panic!("expected say");
        };
        let job = say.to_job();
        assert_eq!(job.text, "Hello there");
        assert_eq!(job.voice, "alice");
        assert_eq!(job.base, "en_default");
        assert_eq!(job.lang, "EN");
        assert_eq!(job.speed, 1.0);
        assert_eq!(job.out, PathBuf::from("out.wav"));
        assert!(!job.normalize);
    }

    #[test]
    fn test_parse_say_requires_text_and_voice() {
        let result = Args::try_parse_from(["openvoice-launcher", "say", "--voice", "alice"]);
        assert!(result.is_err());

        let result = Args::try_parse_from(["openvoice-launcher", "say", "--text", "hi"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_say_all_options() {
        let args = parse(&[
            "say", "--text", "Bonjour", "--voice", "bob", "--base", "fr_default", "--lang", "FR",
            "--speed", "0.9", "--rhythm", "1.1", "--normalize", "--out", "b.wav",
        ]);

        let Command::Say(say) = args.command else {
            panic!("expected say");
        };
        let job = say.to_job();
        assert_eq!(job.base, "fr_default");
        assert_eq!(job.lang, "FR");
        assert_eq!(job.speed, 0.9);
        assert_eq!(job.rhythm, 1.1);
        assert!(job.normalize);
        assert_eq!(job.out, PathBuf::from("b.wav"));
    }

    #[test]
    fn test_parse_extract_with_name() {
        let args = parse(&["extract", "ref.wav", "-n", "alice"]);

        let Command::Extract(extract) = args.command else {
            panic!("expected extract");
        };
        let job = extract.to_job();
        assert_eq!(job.wav, PathBuf::from("ref.wav"));
        assert_eq!(job.name.as_deref(), Some("alice"));
    }

    #[test]
    fn test_parse_long_synth() {
        let args = parse(&[
            "long-synth", "book.txt", "ref.wav", "book.wav", "--emotion", "cheerful",
            "--samplerate", "44100",
        ]);

        let Command::LongSynth(long) = args.command else {
            panic!("expected long-synth");
        };
        let job = long.to_job();
        assert_eq!(job.text_file, PathBuf::from("book.txt"));
        assert_eq!(job.reference_wav, PathBuf::from("ref.wav"));
        assert_eq!(job.output_wav, PathBuf::from("book.wav"));
        assert_eq!(job.emotion, "cheerful");
        assert_eq!(job.samplerate, "44100");
        assert_eq!(job.channels, "mono");
        assert_eq!(job.format, "WAV");
    }

    #[test]
    fn test_parse_exec_keeps_hyphenated_tokens() {
        let args = parse(&["exec", "--", "ls", "-la", "--color=never"]);

        let Command::Exec { tokens } = args.command else {
            panic!("expected exec");
        };
        assert_eq!(tokens, vec!["ls", "-la", "--color=never"]);
    }

    #[test]
    fn test_parse_exec_requires_tokens() {
        assert!(Args::try_parse_from(["openvoice-launcher", "exec"]).is_err());
    }

    #[test]
    fn test_parse_config_actions() {
        for (word, action) in [
            ("show", ConfigAction::Show),
            ("path", ConfigAction::Path),
            ("save", ConfigAction::Save),
        ] {
            let args = parse(&["config", word]);
            let Command::Config { action: parsed } = args.command else {
                panic!("expected config");
            };
            assert_eq!(parsed, action);
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = parse(&["extract", "ref.wav", "--python", "python3.10", "-v", "--dry-run"]);

        assert_eq!(args.python.as_deref(), Some("python3.10"));
        assert!(args.verbose);
        assert!(args.dry_run);
    }

    #[test]
    fn test_apply_overrides() {
        let args = parse(&[
            "--python", "/env/python", "--scripts-dir", "/srv/ov", "--workdir", "/data", "config",
            "show",
        ]);

        let config = args.apply_overrides(LauncherConfig::default());
        assert_eq!(config.python, "/env/python");
        assert_eq!(config.scripts_dir, PathBuf::from("/srv/ov"));
        assert_eq!(config.workdir, Some(PathBuf::from("/data")));
    }

    #[test]
    fn test_apply_overrides_keeps_loaded_values() {
        let args = parse(&["config", "show"]);
        let loaded = LauncherConfig {
            python: "python3.11".to_string(),
            ..LauncherConfig::default()
        };

        assert_eq!(args.apply_overrides(loaded.clone()), loaded);
    }

    // ===========================================
    // Batch files
    // ===========================================

    #[test]
    fn test_parse_batch_skips_comments_and_blanks() {
        let input = "# warm-up\n\n[\"echo\", \"one\"]\n  [\"python3\", \"say.py\", \"--text\", \"a b\"]  \n";

        let entries = parse_batch(input).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].line, 3);
        assert_eq!(entries[0].tokens, vec!["echo", "one"]);
        assert_eq!(entries[1].line, 4);
        assert_eq!(entries[1].tokens[3], "a b");
    }

    #[test]
    fn test_parse_batch_rejects_non_array() {
        let result = parse_batch("[\"echo\"]\necho two\n");

        assert!(matches!(
            result,
            Err(BatchParseError::InvalidLine { line: 2, .. })
        ));
    }

    #[test]
    fn test_parse_batch_rejects_empty_command() {
        assert!(matches!(
            parse_batch("[]"),
            Err(BatchParseError::EmptyCommand { line: 1 })
        ));
        assert!(matches!(
            parse_batch("[\"\"]"),
            Err(BatchParseError::EmptyCommand { line: 1 })
        ));
    }

    #[test]
    fn test_batch_entry_label_uses_program_basename() {
        let entry = BatchEntry {
            line: 7,
            tokens: vec!["/usr/bin/python3".to_string(), "say.py".to_string()],
        };
        assert_eq!(entry.label(), "7:python3");
    }

    // ===========================================
    // Exit status
    // ===========================================

    #[test]
    fn test_exit_status_passes_child_code_through() {
        assert_eq!(exit_status(0), 0);
        assert_eq!(exit_status(7), 7);
        assert_eq!(exit_status(255), 255);
    }

    #[test]
    fn test_exit_status_out_of_range_is_failure() {
        assert_eq!(exit_status(-1), 1);
        assert_eq!(exit_status(300), 1);
    }

    #[test]
    fn test_batch_outcome_counts_failures() {
        use crate::runner::InvocationId;

        let mut outcome = BatchOutcome::default();
        assert_eq!(outcome.exit_status(), 0);

        outcome.codes.insert(InvocationId(0), 0);
        outcome.codes.insert(InvocationId(1), 0);
        assert_eq!(outcome.failed(), 0);

        outcome.codes.insert(InvocationId(2), 3);
        outcome.spawn_failures = 1;
        assert_eq!(outcome.failed(), 2);
        assert_eq!(outcome.exit_status(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_run_batch_with_unstartable_entry_fails() {
        use crate::runner::{Invocation, LogPane};

        let invocations = vec![
            (
                "1:missing".to_string(),
                Invocation::new(["openvoice-launcher-no-such-program"]).unwrap(),
            ),
            (
                "2:sh".to_string(),
                Invocation::new(["sh", "-c", "echo ok"]).unwrap(),
            ),
        ];
        let pane = LogPane::new(Vec::new());

        let outcome = run_batch(invocations, &pane);

        assert_eq!(outcome.spawn_failures, 1);
        assert_eq!(outcome.codes.len(), 1);
        assert_eq!(outcome.failed(), 1);
        assert_eq!(outcome.exit_status(), 1);

        let text = String::from_utf8(pane.into_inner()).unwrap();
        assert!(text.contains("[1:missing] Cannot start process"));
        assert!(text.contains("[2:sh] ok\n"));
        assert!(text.contains("[2:sh] [exit 0]\n"));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_batch_all_succeeding_is_success() {
        use crate::runner::{Invocation, LogPane};

        let invocations = (1..=3)
            .map(|n| {
                (
                    format!("{n}:sh"),
                    Invocation::new(["sh", "-c", "echo done"]).unwrap(),
                )
            })
            .collect();
        let pane = LogPane::new(Vec::new());

        let outcome = run_batch(invocations, &pane);

        assert_eq!(outcome.codes.len(), 3);
        assert_eq!(outcome.exit_status(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_run_batch_nonzero_exit_fails() {
        use crate::runner::{Invocation, LogPane};

        let invocations = vec![(
            "1:sh".to_string(),
            Invocation::new(["sh", "-c", "exit 4"]).unwrap(),
        )];
        let pane = LogPane::new(Vec::new());

        let outcome = run_batch(invocations, &pane);

        assert_eq!(outcome.spawn_failures, 0);
        assert_eq!(outcome.exit_status(), 1);
    }
}
