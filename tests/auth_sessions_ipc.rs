mod test_support;

use serde_json::json;
use test_support::{error_code, message_texts, Sidecar, SEED_STUDENT};

#[test]
fn login_returns_principal_and_rejects_bad_credentials_alike() {
    let workspace = tempfile::tempdir().expect("tempdir");
    let mut sidecar = Sidecar::open(workspace.path());

    let result = sidecar.login("admin", "admin123");
    assert_eq!(result["principal"]["role"], json!("administrator"));
    assert_eq!(result["principal"]["name"], json!("System Administrator"));
    assert_eq!(result["principal"]["indexNumber"], json!("admin"));

    sidecar.session = None;
    let wrong = sidecar.request_err(
        "auth.login",
        json!({ "indexNumber": "admin", "password": "nope" }),
    );
    let unknown = sidecar.request_err(
        "auth.login",
        json!({ "indexNumber": "ghost", "password": "admin123" }),
    );
    assert_eq!(error_code(&wrong), "invalid_credentials");
    assert_eq!(wrong, unknown);
    assert_eq!(wrong["message"], json!("Invalid Index Number or Password"));
}

#[test]
fn role_boundaries_are_enforced() {
    let workspace = tempfile::tempdir().expect("tempdir");
    let mut sidecar = Sidecar::open(workspace.path());
    sidecar.login_admin();
    sidecar.create_user("clerk", "Desk Clerk", "admin");

    sidecar.login(SEED_STUDENT.0, SEED_STUDENT.1);
    let dash = sidecar.request_ok("student.dashboard", json!({}));
    assert_eq!(dash["student"]["name"], json!("John Doe"));
    assert_eq!(dash["records"], json!([]));
    for method in ["admin.dashboard", "attendance.bulkMark", "excuses.pending", "users.list"] {
        let error = sidecar.request_err(method, json!({}));
        assert_eq!(error_code(&error), "forbidden", "{}", method);
    }

    sidecar.login("clerk", "pw");
    let dash = sidecar.request_ok("admin.dashboard", json!({}));
    assert_eq!(dash["isAdministrator"], json!(false));
    assert!(dash["users"].is_null());
    let error = sidecar.request_err("excuses.mine", json!({}));
    assert_eq!(error_code(&error), "forbidden");
    let error = sidecar.request_err("users.list", json!({}));
    assert_eq!(error_code(&error), "forbidden");
    let error = sidecar.request_err(
        "attendance.exportCsv",
        json!({ "outPath": workspace.path().join("out.csv").to_string_lossy() }),
    );
    assert_eq!(error_code(&error), "forbidden");
}

#[test]
fn logout_closes_the_session() {
    let workspace = tempfile::tempdir().expect("tempdir");
    let mut sidecar = Sidecar::open(workspace.path());
    sidecar.login_admin();
    sidecar.request_ok("profile.get", json!({}));

    let out = sidecar.request_ok("auth.logout", json!({}));
    assert_eq!(out["closed"], json!(true));
    let error = sidecar.request_err("profile.get", json!({}));
    assert_eq!(error_code(&error), "unauthenticated");
}

#[test]
fn reset_password_and_profile_update() {
    let workspace = tempfile::tempdir().expect("tempdir");
    let mut sidecar = Sidecar::open(workspace.path());

    let missing = sidecar.request_err(
        "auth.resetPassword",
        json!({ "indexNumber": "S0000", "newPassword": "x" }),
    );
    assert_eq!(error_code(&missing), "not_found");

    let reset = sidecar.request_ok(
        "auth.resetPassword",
        json!({ "indexNumber": "S1234", "newPassword": "fresh" }),
    );
    assert_eq!(
        message_texts(&reset),
        ["Password reset successful. Please log in."]
    );
    sidecar.login("S1234", "fresh");

    let updated = sidecar.request_ok(
        "profile.update",
        json!({ "name": "Johnny Doe", "password": "" }),
    );
    assert_eq!(updated["user"]["name"], json!("Johnny Doe"));
    let dash = sidecar.request_ok("student.dashboard", json!({}));
    assert_eq!(dash["student"]["name"], json!("Johnny Doe"));

    sidecar.request_ok("profile.update", json!({ "password": "newer" }));
    sidecar.session = None;
    sidecar.login("S1234", "newer");
    let profile = sidecar.request_ok("profile.get", json!({}));
    assert_eq!(profile["user"]["name"], json!("Johnny Doe"));
    assert!(profile["user"].get("passwordHash").is_none());
}
