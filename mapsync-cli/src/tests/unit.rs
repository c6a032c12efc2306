//! Focused unit tests covering `run` configuration validation.

use super::*;
use rstest::{fixture, rstest};

#[fixture]
fn args() -> RunArgs {
    RunArgs {
        api_url: Some("https://api.openstreetmap.org".into()),
        api_token: Some("token".into()),
        ..RunArgs::default()
    }
}

#[rstest]
fn defaults_fill_unset_options(args: RunArgs) {
    let config = RunConfig::try_from(args).expect("valid config");

    assert_eq!(config.credentials, Credentials::Bearer("token".into()));
    assert_eq!(config.language, "fr");
    assert_eq!(config.changeset_language, "en");
    assert_eq!(config.interval, Duration::from_secs(300));
    assert_eq!(config.timeout, Duration::from_secs(30));
    assert_eq!(config.database, Utf8PathBuf::from("contributions.db"));
    assert_eq!(config.locales_dir, Utf8PathBuf::from("locales"));
    assert_eq!(config.element_url_base, "https://api.openstreetmap.org");
    assert_eq!(config.note_ack_policy, NoteAckPolicy::Drop);
    assert!(!config.once);
}

#[rstest]
#[case(None)]
#[case(Some("  "))]
fn converting_without_api_url_errors(mut args: RunArgs, #[case] url: Option<&str>) {
    args.api_url = url.map(str::to_owned);
    let err = RunConfig::try_from(args).expect_err("missing url should error");
    match err {
        CliError::MissingArgument { field, env } => {
            assert_eq!(field, ARG_API_URL);
            assert_eq!(env, ENV_API_URL);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
fn missing_credentials_are_fatal(mut args: RunArgs) {
    args.api_token = None;
    let err = RunConfig::try_from(args).expect_err("no credentials");
    assert!(matches!(err, CliError::MissingCredentials), "{err:?}");
}

#[rstest]
fn user_without_password_names_the_password(mut args: RunArgs) {
    args.api_token = None;
    args.api_user = Some("mapper".into());
    let err = RunConfig::try_from(args).expect_err("no password");
    match err {
        CliError::MissingArgument { field, env } => {
            assert_eq!(field, ARG_API_PASSWORD);
            assert_eq!(env, ENV_API_PASSWORD);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
fn basic_credentials_are_used_without_token(mut args: RunArgs) {
    args.api_token = None;
    args.api_user = Some("mapper".into());
    args.api_password = Some("pw".into());
    let config = RunConfig::try_from(args).expect("valid config");
    assert_eq!(
        config.credentials,
        Credentials::Basic {
            user: "mapper".into(),
            password: "pw".into(),
        }
    );
}

#[rstest]
fn token_takes_precedence_over_basic(mut args: RunArgs) {
    args.api_user = Some("mapper".into());
    args.api_password = Some("pw".into());
    let config = RunConfig::try_from(args).expect("valid config");
    assert_eq!(config.credentials, Credentials::Bearer("token".into()));
}

#[rstest]
fn zero_interval_is_rejected(mut args: RunArgs) {
    args.interval_secs = Some(0);
    let err = RunConfig::try_from(args).expect_err("zero interval");
    assert!(matches!(err, CliError::ZeroInterval));
}

#[rstest]
fn scheduler_config_reflects_options(mut args: RunArgs) {
    args.interval_secs = Some(20);
    args.element_url_base = Some("https://www.openstreetmap.org".into());
    args.changeset_language = Some("fr".into());
    args.requeue_note_acks = true;
    let config = RunConfig::try_from(args).expect("valid config");

    let scheduler = config.scheduler();

    assert_eq!(scheduler.interval, Duration::from_secs(20));
    assert_eq!(scheduler.note_offset, Duration::from_secs(10));
    assert_eq!(scheduler.changeset_language.as_deref(), Some("fr"));
    assert_eq!(scheduler.element_url_base, "https://www.openstreetmap.org");
    assert_eq!(scheduler.note_ack_policy, NoteAckPolicy::Requeue);
}

#[rstest]
fn parses_run_flags() {
    let cli = Cli::try_parse_from([
        "mapsync",
        "run",
        "--api-url",
        "https://api.example.org",
        "--api-token",
        "t",
        "--interval-secs",
        "60",
        "--once",
    ])
    .expect("valid arguments");
    let Command::Run(args) = cli.command;
    assert_eq!(args.api_url.as_deref(), Some("https://api.example.org"));
    assert_eq!(args.interval_secs, Some(60));
    assert!(args.once);
    assert!(!args.requeue_note_acks);
}

#[rstest]
fn unknown_flags_are_rejected() {
    let err = Cli::try_parse_from(["mapsync", "run", "--frobnicate"]).expect_err("bad flag");
    assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
}

#[rstest]
fn unacknowledged_single_pass_is_an_error() {
    let pass = SinglePass {
        elements: ElementPass::AckBacklog,
        notes: NotePass::AckBacklog,
        unacknowledged: vec![mapsync_core::ContributionId(7)],
    };
    let err = settle(pass).expect_err("unacknowledged ids");
    match err {
        CliError::Unacknowledged { ids } => {
            assert_eq!(ids, vec![mapsync_core::ContributionId(7)]);
        }
        other => panic!("expected Unacknowledged, found {other:?}"),
    }
}
