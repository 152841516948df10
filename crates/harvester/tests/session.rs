//! Session establishment and interruption dismissal against the stub form

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{Interaction, StubForm};
use quoteharvest_harvester::{Credentials, HarvestConfig, HarvestError, SessionController, Timeouts};

fn config() -> Arc<HarvestConfig> {
    Arc::new(HarvestConfig {
        timeouts: Timeouts::zero(),
        ..HarvestConfig::default()
    })
}

fn controller(form: StubForm, config: Arc<HarvestConfig>) -> (Arc<StubForm>, SessionController<StubForm>) {
    let form = Arc::new(form);
    let session = SessionController::new(form.clone(), config, Credentials::new("agent", "s3cret"));
    (form, session)
}

#[tokio::test]
async fn test_establish_session_is_idempotent() {
    let config = config();
    let (form, session) = controller(StubForm::new(&config.selectors), config.clone());

    session.establish_session().await.unwrap();
    session.establish_session().await.unwrap();

    let login = &config.selectors.login;
    assert_eq!(form.typed_into(&login.username), vec!["agent"]);
    assert_eq!(form.typed_into(&login.password), vec!["s3cret"]);
    assert_eq!(form.count(&Interaction::Open(config.entry_url.clone())), 1);
}

#[tokio::test]
async fn test_already_authenticated_skips_login_form() {
    let config = config();
    let (form, session) = controller(StubForm::new(&config.selectors).logged_in(), config.clone());

    session.establish_session().await.unwrap();

    assert!(form.typed_into(&config.selectors.login.username).is_empty());
    assert_eq!(form.count(&Interaction::Open(config.entry_url.clone())), 0);
}

#[tokio::test]
async fn test_login_timeout_after_budget() {
    let config = config();
    let (form, session) = controller(StubForm::new(&config.selectors).without_auto_login(), config.clone());

    let err = session.establish_session().await.unwrap_err();

    assert!(matches!(err, HarvestError::LoginTimeout { attempts: 30 }));
    assert!(err.is_fatal());
    // Filled fields are left alone on later attempts
    assert_eq!(form.typed_into(&config.selectors.login.username).len(), 1);
    assert_eq!(form.typed_into(&config.selectors.login.password).len(), 1);
}

#[tokio::test]
async fn test_dismiss_without_interruption_is_a_no_op() {
    let config = config();
    let (form, session) = controller(StubForm::new(&config.selectors).logged_in(), config);

    assert!(!session.dismiss_interruption().await);
    assert!(!session.dismiss_interruption().await);
    assert_eq!(form.clicks(), 0);
}

#[tokio::test]
async fn test_dismiss_falls_back_to_programmatic_click() {
    let config = config();
    let (form, session) = controller(
        StubForm::new(&config.selectors).logged_in().rejecting_direct_clicks(),
        config.clone(),
    );
    form.raise_interruption();

    assert!(session.dismiss_interruption().await);
    assert!(!form.interruption_pending());

    let first = config.selectors.interruption.dismiss_candidates[0].clone();
    assert_eq!(form.count(&Interaction::Scroll(first.clone())), 1);
    assert_eq!(form.count(&Interaction::Click(first.clone())), 1);
    assert_eq!(form.count(&Interaction::ForceClick(first)), 1);
}

#[tokio::test]
async fn test_overlay_that_stays_up_is_not_dismissed() {
    let config = Arc::new(HarvestConfig {
        timeouts: Timeouts {
            short_probe_ms: 5,
            long_wait_ms: 60_000,
            ..Timeouts::zero()
        },
        ..HarvestConfig::default()
    });
    let (form, session) = controller(
        StubForm::new(&config.selectors).logged_in().with_sticky_interruption(),
        config.clone(),
    );
    form.raise_interruption();

    assert!(!session.dismiss_interruption().await);
    assert!(form.interruption_pending());

    let overlay = config.selectors.interruption.overlay.clone();
    assert_eq!(form.count(&Interaction::WaitInvisible(overlay)), 2);
    assert_eq!(form.invisible_timeouts(), vec![Duration::from_millis(5); 2]);
}
