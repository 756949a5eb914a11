//! Setup project: proves registration works and writes the session artifact
//! every other suite starts from.

mod common;

use finprobe::dates::unique_email;
use finprobe::prelude::*;

const SUITE: &str = "auth_setup";
const NEW_USER_NAME: &str = "John Doe";
const NEW_USER_PASSWORD: &str = "SecurePass123!";

#[tokio::test]
async fn successful_user_registration() {
    common::run_case(SUITE, "successful_user_registration", |page| async move {
        let auth = AuthPage::new(&page);
        auth.navigate_to_register().await?;
        let email = unique_email("john.doe", "example.com");
        auth.register(NEW_USER_NAME, &email, NEW_USER_PASSWORD).await?;
        auth.verify_registration_success().await
    })
    .await;
}

#[tokio::test]
async fn successful_user_login_and_save_session() {
    let Some(ctx) = common::context(SUITE).await else {
        return;
    };
    let credentials = &ctx.config().credentials;
    let session = ctx.session();

    let entry = ctx
        .run("successful_user_login_and_save_session", |page| async move {
            let auth = AuthPage::new(&page);
            auth.navigate_to_login().await?;
            auth.login(&credentials.email, &credentials.password).await?;

            let dashboard = DashboardPage::for_user(&page, &credentials.full_name);
            dashboard.verify_welcome_message().await?;
            let nav = page.get_by_role(AriaRole::Link, "🏠 Dashboard");
            expect(&nav).to_be_visible().await?;

            let saved = session.ensure(|| page.storage_state()).await?;
            tracing::info!(cookies = saved.cookies.len(), "session saved");
            Ok(())
        })
        .await;
    if let Err(e) = ctx.write_report(vec![entry.clone()]) {
        eprintln!("report not written: {e}");
    }
    if let Err(e) = ctx.close().await {
        eprintln!("closing {SUITE}: {e}");
    }
    common::assert_passed(&entry);
}
