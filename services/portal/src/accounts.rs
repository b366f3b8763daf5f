//! Signup, login and profile flows, independent of HTTP
//!
//! Each function validates a [`Form`] and talks to a [`UserStore`]. Expected
//! failures end up as form messages or in the returned value; only
//! infrastructure failures come back as `Err`.

use tracing::error;

use crate::forms::{Form, email_rx, phone_rx};
use crate::models::{ProfileUpdate, User, UserId};
use crate::repositories::{StoreError, UserStore};

pub const DUPLICATE_EMAIL: &str = "Email already in use";
pub const INVALID_CREDENTIALS: &str = "Email or Password is incorrect";

/// Validate a signup and create the user.
///
/// Returns `Ok(None)` when the form is invalid, in which case the store is
/// never called. A taken email comes back as
/// [`StoreError::DuplicateEmail`] with the form left untouched.
pub async fn process_signup(
    form: &mut Form,
    store: &dyn UserStore,
) -> Result<Option<UserId>, StoreError> {
    form.required(&["email", "password"]);
    form.matches_pattern("email", email_rx());

    if !form.valid() {
        return Ok(None);
    }

    store
        .insert(form.get("email"), form.get("password"))
        .await
        .map(Some)
}

/// Check credentials. Bad credentials add a `generic` form message and
/// return `Ok(None)`.
pub async fn process_login(
    form: &mut Form,
    store: &dyn UserStore,
) -> Result<Option<UserId>, StoreError> {
    match store
        .authenticate(form.get("email"), form.get("password"))
        .await
    {
        Ok(id) => Ok(Some(id)),
        Err(StoreError::InvalidCredentials) => {
            form.errors.add("generic", INVALID_CREDENTIALS);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Read-back form for the dashboard
pub fn profile_form(user: &User) -> Form {
    let age = user.age.map(|age| age.to_string()).unwrap_or_default();

    Form::new([
        ("email", user.email.clone()),
        ("username", user.name.clone().unwrap_or_default()),
        ("phone", user.phone.clone().unwrap_or_default()),
        ("id", user.id.to_string()),
        ("age", age),
    ])
}

/// Dashboard form for `user_id`, or `None` when the login view should be
/// shown instead. Any store failure degrades to the login view.
pub async fn load_dashboard(user_id: Option<UserId>, store: &dyn UserStore) -> Option<Form> {
    let id = user_id?;

    match store.get(id).await {
        Ok(user) => Some(profile_form(&user)),
        Err(StoreError::NotFound) => None,
        Err(e) => {
            error!("Failed to load user {}: {:?}", id, e);
            None
        }
    }
}

/// Outcome of a profile update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The form carries errors, nothing was written
    Invalid,
    Updated,
    /// The user no longer exists
    UnknownUser,
}

/// Validate a profile submission and persist it for `user_id`
pub async fn process_update(
    form: &mut Form,
    user_id: UserId,
    store: &dyn UserStore,
) -> Result<UpdateOutcome, StoreError> {
    form.set("id", user_id.to_string());

    if form.has("username") {
        form.required(&["username"]);
        form.max_length("username", 255);
    }

    if form.has("phone") {
        form.matches_pattern("phone", phone_rx());
    }

    let age = form.age_valid();

    if !form.valid() {
        return Ok(UpdateOutcome::Invalid);
    }

    let changes = ProfileUpdate::new(form.get("username"), form.get("phone"), age);
    match store.update(&changes, user_id).await {
        Ok(()) => Ok(UpdateOutcome::Updated),
        Err(StoreError::NotFound) => Ok(UpdateOutcome::UnknownUser),
        Err(e) => Err(e),
    }
}
