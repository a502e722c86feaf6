//! Two-step phone sign-in form and the guarded dashboard.

use auth::phone::mask_phone_number;
use auth::{AuthError, AuthSession, GuardDecision, Identity, PendingVerification, RouteGuard};

use crate::terminal::Console;

enum Step {
    Phone,
    Code(PendingVerification),
}

/// Drive phone entry then code entry until sign-in succeeds.
///
/// Errors are shown and the form stays usable: a rejected number re-asks
/// for the number, a blank code re-asks for the code, and any other code
/// failure (which consumes the verification) starts over at the number.
/// Returns `None` when input ends or the user submits a blank number.
pub async fn phone_form(session: &AuthSession, console: &dyn Console, preset_phone: Option<String>) -> Option<Identity> {
    let mut preset_phone = preset_phone;
    let mut step = Step::Phone;

    loop {
        step = match step {
            Step::Phone => {
                let phone = match preset_phone.take() {
                    Some(phone) => phone,
                    None => console.prompt("Phone number: ").await.filter(|p| !p.is_empty())?,
                };
                match session.request_passcode(&phone).await {
                    Ok(pending) => {
                        console.say(&format!("Code sent to {}.", mask_phone_number(pending.phone_number())));
                        Step::Code(pending)
                    }
                    Err(err) => {
                        report(console, &err);
                        Step::Phone
                    }
                }
            }
            Step::Code(pending) => {
                let Some(code) = console.prompt("Verification code: ").await else {
                    session.cancel_verification();
                    return None;
                };
                match session.confirm_passcode(&pending, &code).await {
                    Ok(identity) => return Some(identity),
                    Err(err) => {
                        report(console, &err);
                        if code.trim().is_empty() { Step::Code(pending) } else { Step::Phone }
                    }
                }
            }
        };
    }
}

fn report(console: &dyn Console, err: &AuthError) {
    tracing::debug!(code = err.error_code(), retryable = err.retryable(), "sign-in step failed");
    console.say(&format!("Error: {}", err.user_message()));
}

/// Lines for the signed-in view, or `Err` with the guard's decision
/// (`Pending` or `Redirect`) when the visitor may not see it.
pub fn dashboard_lines(guard: &RouteGuard, session: &AuthSession) -> Result<Vec<String>, GuardDecision> {
    let state = session.state();
    match guard.decide(&state) {
        GuardDecision::Allow => {}
        other => return Err(other),
    }
    let Some(identity) = state.identity else {
        return Err(GuardDecision::Redirect(guard.landing_route().to_owned()));
    };

    let mut lines = vec![format!("Welcome, {}!", identity.label()), format!("  uid:   {}", identity.uid)];
    if let Some(email) = &identity.email {
        lines.push(format!("  email: {email}"));
    }
    if let Some(phone) = &identity.phone_number {
        lines.push(format!("  phone: {}", mask_phone_number(phone)));
    }
    Ok(lines)
}

#[cfg(test)]
#[path = "login_test.rs"]
mod tests;
