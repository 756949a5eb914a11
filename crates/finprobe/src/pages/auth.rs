//! Login and registration screens.
//!
//! [`AuthPage::login_or_register`] walks the auth state machine: try the
//! existing account first, register when that fails, and treat "user already
//! exists" during registration as a detour back to sign-in rather than an
//! error.

use std::time::Duration;

use tracing::{debug, info};

use crate::assertion::{expect, expect_url};
use crate::driver::AriaRole;
use crate::locator::{ElementState, Locator, TextMatch};
use crate::page::Page;
use crate::pages::open;
use crate::race::Race;
use crate::result::ProbeResult;
use crate::step::Traced;
use crate::wait::UrlPattern;

const LANDMARK_TIMEOUT: Duration = Duration::from_secs(10);
const LOGIN_SUCCESS_TIMEOUT: Duration = Duration::from_secs(30);
const REGISTRATION_SUCCESS_TIMEOUT: Duration = Duration::from_secs(10);
const ERROR_TIMEOUT: Duration = Duration::from_secs(5);
const LOGIN_SIGNAL_TIMEOUT: Duration = Duration::from_secs(15);
const LOGIN_RACE_DEADLINE: Duration = Duration::from_secs(3);
const REGISTRATION_SETTLE: Duration = Duration::from_secs(1);

const USER_EXISTS: &str = "User with this email already exists";

/// Route [`AuthPage::login_or_register`] took to a signed-in session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPath {
    /// The credentials already worked
    ExistingAccount,
    /// A new account was created, then used
    Registered,
    /// Registration reported the account exists; signed in instead
    RegisteredExisting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoginSignal {
    Dashboard,
    Error,
}

#[derive(Debug, Clone)]
pub struct AuthPage {
    page: Page,

    pub login_welcome_heading: Locator,
    pub email_input: Locator,
    pub password_input: Locator,
    pub sign_in_button: Locator,
    pub create_account_link: Locator,

    pub register_heading: Locator,
    pub full_name_input: Locator,
    pub create_account_button: Locator,
    pub sign_in_link: Locator,
    pub start_free_button: Locator,

    pub error_message: Locator,
    pub success_message: Locator,
    pub user_exists_message: Locator,
    pub sign_in_instead_link: Locator,
}

impl Traced for AuthPage {
    const NAME: &'static str = "AuthPage";
}

impl AuthPage {
    #[must_use]
    pub fn new(page: &Page) -> Self {
        Self {
            login_welcome_heading: page.get_by_text("Welcome Back"),
            email_input: page.get_by_role(AriaRole::Textbox, "Email Address"),
            password_input: page.get_by_role(AriaRole::Textbox, "Password"),
            sign_in_button: page.get_by_role(AriaRole::Button, "Sign In"),
            create_account_link: page
                .get_by_role(AriaRole::Link, TextMatch::pattern("Create Account|Sign Up")),

            register_heading: page.get_by_role(
                AriaRole::Heading,
                TextMatch::pattern_ci("Get Started|Create Account|Sign Up"),
            ),
            full_name_input: page.get_by_role(AriaRole::Textbox, "Full Name"),
            create_account_button: page.get_by_role(AriaRole::Button, "Create Account"),
            sign_in_link: page.get_by_role(
                AriaRole::Link,
                TextMatch::pattern_ci("Sign in instead|Sign In|Log In"),
            ),
            start_free_button: page.get_by_role(AriaRole::Link, "🚀 Start Free Today"),

            error_message: page.get_by_text(TextMatch::pattern_ci("invalid|error|wrong")),
            success_message: page.get_by_text(TextMatch::pattern_ci("success|created|registered")),
            user_exists_message: page.get_by_text(USER_EXISTS),
            sign_in_instead_link: page
                .get_by_role(AriaRole::Link, TextMatch::pattern_ci("Sign in instead")),

            page: page.clone(),
        }
    }

    #[must_use]
    pub const fn page(&self) -> &Page {
        &self.page
    }

    pub async fn navigate_to_login(&self) -> ProbeResult<()> {
        self.try_step(
            "navigate_to_login",
            open(&self.page, "/login", &self.login_welcome_heading, LANDMARK_TIMEOUT),
        )
        .await
    }

    /// Landing page, then the "Start Free" call to action
    pub async fn navigate_to_register(&self) -> ProbeResult<()> {
        self.try_step("navigate_to_register", async {
            self.page.goto("/").await?;
            self.start_free_button.click().await?;
            expect(&self.register_heading)
                .with_timeout(LANDMARK_TIMEOUT)
                .to_be_visible()
                .await
        })
        .await
    }

    /// Fill the sign-in form and submit
    pub async fn login(&self, email: &str, password: &str) -> ProbeResult<()> {
        self.try_step("login", async {
            self.email_input.fill(email).await?;
            self.password_input.fill(password).await?;
            self.sign_in_button.click().await
        })
        .await
    }

    /// Fill the registration form and submit
    pub async fn register(&self, full_name: &str, email: &str, password: &str) -> ProbeResult<()> {
        self.try_step("register", async {
            self.full_name_input.fill(full_name).await?;
            self.email_input.fill(email).await?;
            self.password_input.fill(password).await?;
            self.create_account_button.click().await
        })
        .await
    }

    pub async fn verify_login_page_loaded(&self) -> ProbeResult<()> {
        self.try_step("verify_login_page_loaded", async {
            expect(&self.login_welcome_heading).to_be_visible().await?;
            expect(&self.email_input).to_be_visible().await?;
            expect(&self.password_input).to_be_visible().await?;
            expect(&self.sign_in_button).to_be_visible().await
        })
        .await
    }

    pub async fn verify_register_page_loaded(&self) -> ProbeResult<()> {
        self.try_step("verify_register_page_loaded", async {
            expect(&self.register_heading).to_be_visible().await?;
            expect(&self.full_name_input).to_be_visible().await?;
            expect(&self.email_input).to_be_visible().await?;
            expect(&self.password_input).to_be_visible().await?;
            expect(&self.create_account_button).to_be_visible().await
        })
        .await
    }

    /// A localized dashboard URL, then its "Welcome back, <name>" heading.
    ///
    /// The sign-in screen's own "Welcome Back" heading does not count.
    pub async fn verify_login_success(&self) -> ProbeResult<()> {
        let greeting = self
            .page
            .get_by_role(AriaRole::Heading, TextMatch::pattern("^Welcome back, "));
        self.try_step("verify_login_success", async {
            expect_url(&self.page)
                .with_timeout(LOGIN_SUCCESS_TIMEOUT)
                .to_match(&UrlPattern::localized_dashboard())
                .await?;
            expect(&greeting)
                .with_timeout(LOGIN_SUCCESS_TIMEOUT)
                .to_be_visible()
                .await
        })
        .await
    }

    /// Successful registration lands back on the sign-in screen
    pub async fn verify_registration_success(&self) -> ProbeResult<()> {
        self.try_step(
            "verify_registration_success",
            expect(&self.login_welcome_heading)
                .with_timeout(REGISTRATION_SUCCESS_TIMEOUT)
                .to_be_visible(),
        )
        .await
    }

    pub async fn verify_error_message(&self) -> ProbeResult<()> {
        self.try_step(
            "verify_error_message",
            expect(&self.error_message)
                .with_timeout(ERROR_TIMEOUT)
                .to_be_visible(),
        )
        .await
    }

    pub async fn is_on_login_page(&self) -> ProbeResult<bool> {
        self.try_step("is_on_login_page", async {
            Ok(self.page.url().await?.contains("/login"))
        })
        .await
    }

    /// Whether an error is showing; lookup failures count as no
    pub async fn has_error(&self) -> bool {
        self.step("has_error", async {
            self.error_message.is_visible().await.unwrap_or(false)
        })
        .await
    }

    /// Sign in and report whether it worked.
    ///
    /// Races the dashboard URL against the error message under a 3s
    /// deadline, then reads the page again: still on `/login` or an error
    /// showing means failure. A slow but successful login can be reported
    /// as a failure.
    pub async fn attempt_login(&self, email: &str, password: &str) -> ProbeResult<bool> {
        self.try_step("attempt_login", async {
            self.navigate_to_login().await?;
            self.login(email, password).await?;

            let dashboard = UrlPattern::localized_dashboard();
            let error = self.error_message.clone().first();
            Race::new(LOGIN_RACE_DEADLINE)
                .signal(LoginSignal::Dashboard, async {
                    self.page
                        .wait_for_url_within(&dashboard, LOGIN_SIGNAL_TIMEOUT)
                        .await
                        .map(drop)
                })
                .signal(
                    LoginSignal::Error,
                    error.wait_for_within(ElementState::Visible, LOGIN_SIGNAL_TIMEOUT),
                )
                .resolve(|settlement| async move {
                    debug!(winner = ?settlement.winner, "login race settled");
                    let failed = self.is_on_login_page().await? || self.has_error().await;
                    Ok(!failed)
                })
                .await
        })
        .await
    }

    /// Register, or fall back to sign-in when the account already exists
    pub async fn register_new_account(
        &self,
        full_name: &str,
        email: &str,
        password: &str,
    ) -> ProbeResult<AuthPath> {
        self.try_step("register_new_account", async {
            self.navigate_to_register().await?;
            self.register(full_name, email, password).await?;
            self.page.wait_for_timeout(REGISTRATION_SETTLE).await;

            if self.user_exists_message.is_visible().await.unwrap_or(false) {
                info!(email, "user already exists, navigating to login");
                self.sign_in_instead_link.click().await?;
                return Ok(AuthPath::RegisteredExisting);
            }
            self.verify_registration_success().await?;
            Ok(AuthPath::Registered)
        })
        .await
    }

    /// End signed in, registering first if needed
    pub async fn login_or_register(
        &self,
        full_name: &str,
        email: &str,
        password: &str,
    ) -> ProbeResult<AuthPath> {
        self.try_step("login_or_register", async {
            let path = if self.attempt_login(email, password).await? {
                info!(email, "account already exists, login successful");
                AuthPath::ExistingAccount
            } else {
                info!(email, "account does not exist, registering new account");
                let path = self.register_new_account(full_name, email, password).await?;
                self.login(email, password).await?;
                path
            };
            self.verify_login_success().await?;
            Ok(path)
        })
        .await
    }
}
