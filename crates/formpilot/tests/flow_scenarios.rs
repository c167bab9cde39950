//! End-to-end runs against a scripted listing application
//!
//! The scripted page reproduces the behaviors the flow has to synchronize
//! with: a login modal answering with a dialog, cascading selects populated
//! after their parent changes, and a submission confirmed by a dialog, a
//! redirect, both, or neither.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use formpilot::mock::{Effect, MockElement, ScriptedSession};
use formpilot::pages::fields;
use formpilot::{
    run_scoped, Confirmation, Credentials, FlowConfig, FlowRunner, FlowStep, FormError,
    FormPayload, RunOutcome, Selector, SelectOption, StepFailure, Timeouts,
};
use std::time::Duration;
use tempfile::TempDir;

const BASE: &str = "http://localhost:3000";
const TITLE: &str = "Toyota Vios 2020 bản G";

// ============================================================================
// Scripted application
// ============================================================================

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn placeholder_select(label: &str) -> MockElement {
    MockElement::select(vec![SelectOption::placeholder(label)])
}

fn login_page(session: ScriptedSession) -> ScriptedSession {
    let submit = Selector::submit_button("Đăng nhập");
    session
        .with_element(Selector::button("Đăng Nhập / Đăng ký"), MockElement::button())
        .with_element(Selector::test_id("login-email"), MockElement::text(""))
        .with_element(Selector::test_id("login-password"), MockElement::text(""))
        .with_element(submit.clone(), MockElement::button())
        .on_activate(
            submit,
            vec![
                (ms(10), Effect::OpenDialog("Đăng nhập thành công".into())),
                (Duration::ZERO, Effect::SetStorage("auth_token".into(), "tok-123".into())),
            ],
        )
}

fn listing_form(session: ScriptedSession, brands: MockElement) -> ScriptedSession {
    session
        .with_element(Selector::submit_button("Đăng tin"), MockElement::button())
        .with_element(Selector::test_id(fields::BRAND), brands)
        .with_element(
            Selector::test_id(fields::MODEL),
            placeholder_select("Chọn dòng xe").disabled(),
        )
        .cascade(
            Selector::test_id(fields::BRAND),
            Selector::test_id(fields::MODEL),
            vec![
                SelectOption::placeholder("Chọn dòng xe"),
                SelectOption::new("vios", "Vios"),
                SelectOption::new("camry", "Camry"),
            ],
            ms(30),
        )
        .with_element(Selector::test_id(fields::YEAR), MockElement::text("").digits_only())
        .with_element(Selector::test_id(fields::MILEAGE), MockElement::text("").digits_only())
        .with_element(
            Selector::test_id(fields::BODY_TYPE),
            MockElement::select(vec![
                SelectOption::placeholder("Chọn kiểu dáng"),
                SelectOption::new("sedan", "Sedan"),
                SelectOption::new("suv", "SUV"),
            ]),
        )
        .with_element(
            Selector::test_id(fields::PRICE),
            MockElement::text("").digits_only().settling_after(ms(15)),
        )
        .with_element(
            Selector::test_id(fields::TITLE),
            MockElement::text("").framework_bound(),
        )
        .with_element(Selector::test_id(fields::DESCRIPTION), MockElement::text(""))
        .with_element(
            Selector::test_id(fields::PROVINCE),
            MockElement::select(vec![
                SelectOption::placeholder("Chọn tỉnh thành"),
                SelectOption::new("hcm", "TP. Hồ Chí Minh"),
                SelectOption::new("hn", "Hà Nội"),
            ]),
        )
        .with_element(
            Selector::test_id(fields::DISTRICT),
            placeholder_select("Chọn quận huyện").disabled(),
        )
        .cascade(
            Selector::test_id(fields::PROVINCE),
            Selector::test_id(fields::DISTRICT),
            vec![
                SelectOption::placeholder("Chọn quận huyện"),
                SelectOption::new("q1", "Quận 1"),
            ],
            ms(20),
        )
        .with_element(
            Selector::test_id(fields::ORIGIN),
            MockElement::radio(&["domestic", "imported"]),
        )
        .with_element(Selector::id("images"), MockElement::file())
}

fn brands() -> MockElement {
    MockElement::select(vec![
        SelectOption::placeholder("Chọn hãng xe"),
        SelectOption::new("toyota", "Toyota"),
        SelectOption::new("honda", "Honda"),
    ])
}

/// Application whose submission answers with `effects`
fn application(effects: Vec<(Duration, Effect)>) -> ScriptedSession {
    let session = listing_form(login_page(ScriptedSession::new()), brands());
    session.on_activate(Selector::submit_button("Đăng tin"), effects)
}

fn dialog_then_redirect() -> Vec<(Duration, Effect)> {
    vec![
        (ms(20), Effect::OpenDialog("Đăng tin thành công!".into())),
        (Duration::ZERO, Effect::Redirect("/listings/self".into())),
        (ms(5), Effect::RenderValueOf(Selector::test_id(fields::TITLE))),
    ]
}

fn runner() -> FlowRunner {
    FlowRunner::new(
        FlowConfig::new()
            .with_base_url(BASE)
            .with_timeouts(Timeouts::uniform(400, 5)),
    )
}

fn payload(dir: &TempDir) -> FormPayload {
    let photo = dir.path().join("car1.jpg");
    std::fs::write(&photo, b"\xFF\xD8\xFF").unwrap();
    FormPayload::new()
        .with_text(fields::TITLE, TITLE)
        .with_text(fields::DESCRIPTION, "Xe gia đình, bảo dưỡng định kỳ")
        .with_number(fields::YEAR, 2020)
        .with_number(fields::MILEAGE, 45_000)
        .with_number(fields::PRICE, 520)
        .with_text(fields::ORIGIN, "domestic")
        .with_attachment(photo)
}

fn credentials() -> Credentials {
    Credentials::new("seller@example.com", "s3cret")
}

async fn run(
    session: &mut ScriptedSession,
    payload: &FormPayload,
    creds: &Credentials,
) -> Result<RunOutcome, StepFailure> {
    runner().run(session, payload, creds).await
}

// ============================================================================
// Successful submissions
// ============================================================================

mod success {
    use super::*;

    #[tokio::test]
    async fn test_dialog_then_redirect() {
        let dir = TempDir::new().unwrap();
        let mut session = application(dialog_then_redirect());
        let outcome = run(&mut session, &payload(&dir), &credentials()).await.unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.final_url, format!("{BASE}/listings/self"));
        assert_eq!(
            outcome.confirmation,
            Some(Confirmation::Dialog {
                message: "Đăng tin thành công!".into()
            })
        );
        assert_eq!(outcome.confirmation_text.as_deref(), Some("Đăng tin thành công!"));
    }

    #[tokio::test]
    async fn test_fields_hold_submitted_values() {
        let dir = TempDir::new().unwrap();
        let mut session = application(dialog_then_redirect());
        run(&mut session, &payload(&dir), &credentials()).await.unwrap();

        let value = |name: &str| session.value_of(&Selector::test_id(name));
        assert_eq!(value(fields::BRAND).as_deref(), Some("toyota"));
        assert_eq!(value(fields::MODEL).as_deref(), Some("vios"));
        assert_eq!(value(fields::PROVINCE).as_deref(), Some("hcm"));
        assert_eq!(value(fields::DISTRICT).as_deref(), Some("q1"));
        assert_eq!(value(fields::BODY_TYPE).as_deref(), Some("sedan"));
        assert_eq!(value(fields::PRICE).as_deref(), Some("520"));
        assert_eq!(value(fields::TITLE).as_deref(), Some(TITLE));
        assert_eq!(value(fields::ORIGIN).as_deref(), Some("domestic"));
        assert_eq!(session.files_of(&Selector::id("images")), 1);
    }

    #[tokio::test]
    async fn test_redirect_without_dialog() {
        let dir = TempDir::new().unwrap();
        let mut session = application(vec![
            (ms(20), Effect::Redirect("/listings/self".into())),
            (Duration::ZERO, Effect::RenderText(TITLE.into())),
        ]);
        let outcome = run(&mut session, &payload(&dir), &credentials()).await.unwrap();

        assert_eq!(
            outcome.confirmation,
            Some(Confirmation::Redirect {
                url: format!("{BASE}/listings/self")
            })
        );
        assert_eq!(outcome.confirmation_text.as_deref(), Some("Đăng nhập thành công"));
    }

    #[tokio::test]
    async fn test_explicit_select_values() {
        let dir = TempDir::new().unwrap();
        let mut session = application(dialog_then_redirect());
        let payload = payload(&dir)
            .with_text(fields::BRAND, "toyota")
            .with_text(fields::MODEL, "camry")
            .with_text(fields::BODY_TYPE, "suv");
        run(&mut session, &payload, &credentials()).await.unwrap();

        assert_eq!(session.value_of(&Selector::test_id(fields::MODEL)).as_deref(), Some("camry"));
        assert_eq!(session.value_of(&Selector::test_id(fields::BODY_TYPE)).as_deref(), Some("suv"));
    }

    #[tokio::test]
    async fn test_repeated_runs_are_independent() {
        let dir = TempDir::new().unwrap();
        let payload = payload(&dir);
        for _ in 0..2 {
            let mut session = application(dialog_then_redirect());
            let outcome = run(&mut session, &payload, &credentials()).await.unwrap();
            assert!(outcome.success);
        }
    }
}

// ============================================================================
// Failures
// ============================================================================

mod failures {
    use super::*;

    #[tokio::test]
    async fn test_empty_credentials_fail_before_the_form() {
        let dir = TempDir::new().unwrap();
        let mut session = application(dialog_then_redirect());
        let failure = run(&mut session, &payload(&dir), &Credentials::new("", ""))
            .await
            .unwrap_err();

        assert_eq!(failure.step, FlowStep::Authenticate);
        assert!(matches!(failure.error, FormError::AuthenticationFailed { .. }));
        assert!(!session.was_called(&format!("navigate:{BASE}/create-listing")));
        assert!(!session.was_called("assign_value"));
    }

    #[tokio::test]
    async fn test_placeholder_only_brand() {
        let dir = TempDir::new().unwrap();
        let mut session = listing_form(
            login_page(ScriptedSession::new()),
            placeholder_select("Chọn hãng xe"),
        )
        .on_activate(Selector::submit_button("Đăng tin"), dialog_then_redirect());
        let failure = run(&mut session, &payload(&dir), &credentials()).await.unwrap_err();

        assert_eq!(failure.step, FlowStep::PopulateFields);
        match &failure.error {
            FormError::NoOptionsAvailable { selector, option_count } => {
                assert!(selector.contains("brand"));
                assert_eq!(*option_count, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!session.was_called("read_select:testid=model"));
        assert!(!session.was_called("activate:submit-button=Đăng tin"));
    }

    #[tokio::test]
    async fn test_no_dialog_and_no_redirect() {
        let dir = TempDir::new().unwrap();
        let mut session = application(Vec::new());
        let failure = run(&mut session, &payload(&dir), &credentials()).await.unwrap_err();

        assert_eq!(failure.step, FlowStep::ResolveConfirmation);
        assert!(matches!(failure.error, FormError::SubmissionNotConfirmed { .. }));
        assert_eq!(
            failure.snapshot.final_url.as_deref(),
            Some(format!("{BASE}/create-listing").as_str())
        );
        assert!(failure.snapshot.page_source.is_some());
    }

    #[tokio::test]
    async fn test_rejection_dialog() {
        let dir = TempDir::new().unwrap();
        let mut session = application(vec![(ms(10), Effect::OpenDialog("Đăng tin thất bại".into()))]);
        let failure = run(&mut session, &payload(&dir), &credentials()).await.unwrap_err();

        assert_eq!(failure.step, FlowStep::ResolveConfirmation);
        assert_eq!(
            failure.snapshot.confirmation_text.as_deref(),
            Some("Đăng tin thất bại")
        );
    }

    #[tokio::test]
    async fn test_dialog_without_redirect_fails_verification() {
        let dir = TempDir::new().unwrap();
        let mut session = application(vec![(ms(10), Effect::OpenDialog("Đăng tin thành công!".into()))]);
        let failure = run(&mut session, &payload(&dir), &credentials()).await.unwrap_err();

        assert_eq!(failure.step, FlowStep::AwaitRedirect);
        assert_eq!(failure.error.kind(), "VerificationFailed");
        assert_eq!(
            failure.snapshot.confirmation_text.as_deref(),
            Some("Đăng tin thành công!")
        );
    }

    #[tokio::test]
    async fn test_missing_token_fails_authentication() {
        let dir = TempDir::new().unwrap();
        let submit = Selector::submit_button("Đăng nhập");
        let mut session = application(dialog_then_redirect()).on_activate(
            submit,
            vec![(ms(10), Effect::OpenDialog("Sai mật khẩu".into()))],
        );
        let failure = run(&mut session, &payload(&dir), &credentials()).await.unwrap_err();

        assert_eq!(failure.step, FlowStep::ConfirmAuthentication);
        assert!(failure.error.to_string().contains("Sai mật khẩu"));
    }

    #[tokio::test]
    async fn test_invalid_payload_touches_nothing() {
        let mut session = application(dialog_then_redirect());
        let payload = FormPayload::new().with_text(fields::TITLE, TITLE);
        let failure = run(&mut session, &payload, &credentials()).await.unwrap_err();

        assert_eq!(failure.step, FlowStep::ValidatePayload);
        assert!(failure.error.is_precondition());
        assert!(!session.was_called("navigate"));
    }

    #[tokio::test]
    async fn test_blank_brand_fails_before_navigation() {
        let dir = TempDir::new().unwrap();
        let mut session = application(dialog_then_redirect());
        let payload = payload(&dir).with_text(fields::BRAND, "");
        let failure = run(&mut session, &payload, &credentials()).await.unwrap_err();

        assert_eq!(failure.step, FlowStep::ValidatePayload);
        assert!(matches!(failure.error, FormError::MissingRequiredField { ref field } if field == "brand"));
        assert!(!session.was_called("navigate"));
    }

    #[tokio::test]
    async fn test_blank_body_type_is_not_left_on_placeholder() {
        let dir = TempDir::new().unwrap();
        let mut session = application(dialog_then_redirect());
        let payload = payload(&dir).with_text(fields::BODY_TYPE, "");
        let failure = run(&mut session, &payload, &credentials()).await.unwrap_err();

        assert_eq!(failure.step, FlowStep::ValidatePayload);
        assert_eq!(failure.error.kind(), "InvalidPayload");
        assert!(!session.was_called("activate:submit-button=Đăng tin"));
        assert_eq!(
            session.value_of(&Selector::test_id(fields::BODY_TYPE)).as_deref(),
            Some("")
        );
    }

    #[tokio::test]
    async fn test_unknown_radio_value_names_the_field() {
        let dir = TempDir::new().unwrap();
        let mut session = application(dialog_then_redirect());
        let payload = payload(&dir).with_text(fields::ORIGIN, "smuggled");
        let failure = run(&mut session, &payload, &credentials()).await.unwrap_err();

        assert_eq!(failure.step, FlowStep::PopulateFields);
        match &failure.error {
            FormError::LocatorNotFound { field, selector } => {
                assert_eq!(field, "origin");
                assert!(selector.contains("testid=origin"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_unsettled_price_names_the_field() {
        let dir = TempDir::new().unwrap();
        let mut session = application(dialog_then_redirect()).with_element(
            Selector::test_id(fields::PRICE),
            MockElement::text("").digits_only().settling_after(ms(5_000)),
        );
        let failure = run(&mut session, &payload(&dir), &credentials()).await.unwrap_err();

        assert_eq!(failure.step, FlowStep::PopulateFields);
        assert_eq!(failure.error.kind(), "FieldNotSettled");
        assert!(failure.error.to_string().contains("`price` (testid=price)"));
    }
}

// ============================================================================
// Scoped sessions
// ============================================================================

mod scoped {
    use super::*;

    #[tokio::test]
    async fn test_session_closed_after_success() {
        let dir = TempDir::new().unwrap();
        let payload = payload(&dir);
        let creds = credentials();
        let session = application(dialog_then_redirect());
        let observer = session.clone();
        let runner = runner();

        let result = run_scoped(session, move |s| {
            Box::pin(async move { runner.run(s, &payload, &creds).await })
        })
        .await;
        assert!(result.is_ok());
        assert!(observer.is_closed());
    }

    #[tokio::test]
    async fn test_session_closed_after_failure() {
        let dir = TempDir::new().unwrap();
        let payload = payload(&dir);
        let creds = Credentials::new("", "");
        let session = application(dialog_then_redirect());
        let observer = session.clone();
        let runner = runner();

        let result = run_scoped(session, move |s| {
            Box::pin(async move { runner.run(s, &payload, &creds).await })
        })
        .await;
        assert_eq!(result.unwrap_err().step, FlowStep::Authenticate);
        assert!(observer.is_closed());
    }
}
