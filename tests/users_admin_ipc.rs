mod test_support;

use serde_json::json;
use test_support::{error_code, message_texts, Sidecar};

fn index_numbers(list: &serde_json::Value) -> Vec<String> {
    list["users"]
        .as_array()
        .expect("users")
        .iter()
        .filter_map(|u| u["indexNumber"].as_str().map(str::to_string))
        .collect()
}

#[test]
fn create_list_and_delete_users() {
    let workspace = tempfile::tempdir().expect("tempdir");
    let mut sidecar = Sidecar::open(workspace.path());
    sidecar.login_admin();

    let created = sidecar.request_ok(
        "users.create",
        json!({
            "indexNumber": "S0042",
            "name": "Grace Hopper",
            "password": "cobol",
            "role": "student",
        }),
    );
    assert_eq!(message_texts(&created), ["User added successfully."]);
    assert_eq!(created["user"]["role"], json!("student"));
    assert!(created["user"].get("passwordHash").is_none());
    sidecar.create_user("clerk", "Desk Clerk", "admin");

    let list = sidecar.request_ok("users.list", json!({}));
    assert_eq!(index_numbers(&list), ["clerk", "admin", "S0042", "S1234"]);

    let dup = sidecar.request_err(
        "users.create",
        json!({ "indexNumber": "S0042", "name": "X", "password": "x", "role": "student" }),
    );
    assert_eq!(error_code(&dup), "conflict");
    assert_eq!(dup["message"], json!("User already exists."));
    let bad_role = sidecar.request_err(
        "users.create",
        json!({ "indexNumber": "S0043", "name": "X", "password": "x", "role": "dean" }),
    );
    assert_eq!(error_code(&bad_role), "validation_failed");

    let removed = sidecar.request_ok("users.delete", json!({ "indexNumber": "S0042" }));
    assert_eq!(message_texts(&removed), ["User removed successfully."]);
    let missing = sidecar.request_err("users.delete", json!({ "indexNumber": "S0042" }));
    assert_eq!(error_code(&missing), "not_found");
    assert_eq!(missing["message"], json!("User not found."));
}

#[test]
fn deleting_a_user_closes_their_sessions() {
    let workspace = tempfile::tempdir().expect("tempdir");
    let mut sidecar = Sidecar::open(workspace.path());
    sidecar.login_admin();
    let admin_session = sidecar.session.clone();

    sidecar.login("S1234", "1234");
    let student_session = sidecar.session.clone();
    sidecar.request_ok("student.dashboard", json!({}));

    sidecar.session = admin_session;
    let removed = sidecar.request_ok("users.delete", json!({ "indexNumber": "S1234" }));
    assert_eq!(removed["sessionsClosed"], json!(1));

    sidecar.session = student_session;
    let error = sidecar.request_err("student.dashboard", json!({}));
    assert_eq!(error_code(&error), "unauthenticated");
}

#[test]
fn accounts_survive_a_restart() {
    let workspace = tempfile::tempdir().expect("tempdir");
    {
        let mut sidecar = Sidecar::open(workspace.path());
        sidecar.login_admin();
        sidecar.create_user("S0077", "Katherine Johnson", "student");
    }

    let mut sidecar = Sidecar::open(workspace.path());
    sidecar.login("S0077", "pw");
    let profile = sidecar.request_ok("profile.get", json!({}));
    assert_eq!(profile["user"]["name"], json!("Katherine Johnson"));

    sidecar.login_admin();
    let list = sidecar.request_ok("users.list", json!({}));
    assert_eq!(index_numbers(&list).len(), 3);
}
