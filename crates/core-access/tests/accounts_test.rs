use anyhow::Result;
use core_access::{
    CoreAccessError, Role, UserAccessUpdate, list_users,
    token::decode_access_token, update_user_access,
};
use zygote_test_utils::{TEST_PASSWORD, TestSetup, test_token_config};

#[tokio::test]
async fn register_verify_flow_issues_student_tokens() -> Result<()> {
    let setup = TestSetup::new().await?;

    let registered = setup
        .accounts
        .register("New.Student@Example.com", "Str0ng@Pass", "New Student")
        .await?;
    assert_eq!(registered.email, "new.student@example.com");
    assert!(registered.otp_sent);

    let code = setup
        .notifier
        .last_code_for("new.student@example.com")
        .expect("an OTP should have been sent");
    let session = setup
        .accounts
        .verify_otp("new.student@example.com", &code)
        .await?;

    assert!(session.user.is_verified);
    assert_eq!(session.user.role, Role::Student);
    assert!(!session.refresh_token.is_empty());

    let claims = decode_access_token(&session.token, &test_token_config())?;
    assert_eq!(claims.sub, registered.user_id);
    assert_eq!(claims.role, Role::Student);

    let audits = setup
        .count("SELECT COUNT(*) FROM activity_logs WHERE action = 'USER_REGISTERED'")
        .await?;
    assert_eq!(audits, 1);
    Ok(())
}

#[tokio::test]
async fn duplicate_email_is_a_conflict_regardless_of_case() -> Result<()> {
    let setup = TestSetup::new().await?;
    setup
        .accounts
        .register("dup@example.com", "Str0ng@Pass", "First")
        .await?;

    let err = setup
        .accounts
        .register("DUP@Example.com", "Str0ng@Pass", "Second")
        .await
        .unwrap_err();
    assert!(matches!(err, CoreAccessError::Conflict(_)));
    assert_eq!(setup.count("SELECT COUNT(*) FROM users").await?, 1);
    Ok(())
}

#[tokio::test]
async fn weak_password_creates_no_rows() -> Result<()> {
    let setup = TestSetup::new().await?;

    for weak in ["short1!", "alllowercase1!", "NoDigits!!", "NoSpecial123"] {
        let err = setup
            .accounts
            .register("weak@example.com", weak, "Weak")
            .await
            .unwrap_err();
        assert!(matches!(err, CoreAccessError::Validation(_)), "{weak}");
    }

    assert_eq!(setup.count("SELECT COUNT(*) FROM users").await?, 0);
    assert_eq!(setup.count("SELECT COUNT(*) FROM otp_verifications").await?, 0);
    assert!(setup.notifier.sent().is_empty());
    Ok(())
}

#[tokio::test]
async fn otp_can_only_be_used_once() -> Result<()> {
    let setup = TestSetup::new().await?;
    setup
        .accounts
        .register("once@example.com", "Str0ng@Pass", "Once")
        .await?;
    let code = setup.notifier.last_code_for("once@example.com").unwrap();

    setup.accounts.verify_otp("once@example.com", &code).await?;
    let err = setup
        .accounts
        .verify_otp("once@example.com", &code)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreAccessError::InvalidOtp));
    Ok(())
}

#[tokio::test]
async fn expired_otp_is_rejected() -> Result<()> {
    let setup = TestSetup::new().await?;
    setup
        .accounts
        .register("late@example.com", "Str0ng@Pass", "Late")
        .await?;
    let code = setup.notifier.last_code_for("late@example.com").unwrap();

    let conn = setup.db.connect()?;
    conn.execute(
        "UPDATE otp_verifications SET expires_at = '2000-01-01 00:00:00'",
        (),
    )
    .await?;

    let err = setup
        .accounts
        .verify_otp("late@example.com", &code)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreAccessError::InvalidOtp));
    Ok(())
}

#[tokio::test]
async fn login_failures_are_indistinguishable() -> Result<()> {
    let setup = TestSetup::new().await?;
    let admin = setup.create_user("admin@example.com", Role::Admin).await?;
    let locked = setup.create_user("locked@example.com", Role::Editor).await?;
    update_user_access(
        &setup.db,
        &admin.id,
        &locked.id,
        UserAccessUpdate {
            role: None,
            is_active: Some(false),
        },
    )
    .await?;

    let unknown = setup
        .accounts
        .login("nobody@example.com", TEST_PASSWORD)
        .await
        .unwrap_err();
    let wrong = setup
        .accounts
        .login("admin@example.com", "Wr0ng@Pass")
        .await
        .unwrap_err();
    let inactive = setup
        .accounts
        .login("locked@example.com", TEST_PASSWORD)
        .await
        .unwrap_err();

    for err in [unknown, wrong, inactive] {
        assert!(matches!(err, CoreAccessError::InvalidCredentials));
        assert_eq!(err.to_string(), "Invalid email or password.");
    }
    Ok(())
}

#[tokio::test]
async fn unverified_student_login_gets_a_fresh_code_instead_of_tokens() -> Result<()> {
    let setup = TestSetup::new().await?;
    let registered = setup
        .accounts
        .register("pending@example.com", "Str0ng@Pass", "Pending")
        .await?;

    let err = setup
        .accounts
        .login("pending@example.com", "Str0ng@Pass")
        .await
        .unwrap_err();
    match err {
        CoreAccessError::EmailNotVerified { user_id, email } => {
            assert_eq!(user_id, registered.user_id);
            assert_eq!(email, "pending@example.com");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(setup.notifier.sent().len(), 2);
    assert_eq!(setup.count("SELECT COUNT(*) FROM refresh_tokens").await?, 0);
    Ok(())
}

#[tokio::test]
async fn login_records_audit_and_refresh_then_logout_revokes() -> Result<()> {
    let setup = TestSetup::new().await?;
    setup.create_user("editor@example.com", Role::Editor).await?;

    let session = setup
        .accounts
        .login("editor@example.com", TEST_PASSWORD)
        .await?;
    assert!(session.user.last_login.is_some());
    assert_eq!(
        setup
            .count("SELECT COUNT(*) FROM activity_logs WHERE action = 'USER_LOGIN'")
            .await?,
        1
    );

    let (user, access_token) = setup.accounts.refresh(&session.refresh_token).await?;
    assert_eq!(user.id, session.user.id);
    let claims = decode_access_token(&access_token, &test_token_config())?;
    assert_eq!(claims.role, Role::Editor);

    setup
        .accounts
        .logout(&session.user.id, Some(&session.refresh_token))
        .await?;
    let err = setup
        .accounts
        .refresh(&session.refresh_token)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreAccessError::TokenInvalid(_)));
    Ok(())
}

#[tokio::test]
async fn resend_otp_rules() -> Result<()> {
    let setup = TestSetup::new().await?;
    setup.create_user("verified@example.com", Role::Student).await?;

    let missing = setup.accounts.resend_otp("ghost@example.com").await.unwrap_err();
    assert!(matches!(missing, CoreAccessError::NotFound(_)));

    let verified = setup
        .accounts
        .resend_otp("verified@example.com")
        .await
        .unwrap_err();
    assert!(matches!(verified, CoreAccessError::Validation(_)));

    setup
        .accounts
        .register("again@example.com", "Str0ng@Pass", "Again")
        .await?;
    setup.accounts.resend_otp("again@example.com").await?;
    let second = setup.notifier.last_code_for("again@example.com").unwrap();

    assert_eq!(
        setup
            .count("SELECT COUNT(*) FROM otp_verifications WHERE email = 'again@example.com'")
            .await?,
        2
    );
    let session = setup.accounts.verify_otp("again@example.com", &second).await?;
    assert!(session.user.is_verified);
    Ok(())
}

#[tokio::test]
async fn admin_can_change_roles_and_list_users() -> Result<()> {
    let setup = TestSetup::new().await?;
    let admin = setup.create_user("root@example.com", Role::Admin).await?;
    let student = setup.create_user("learner@example.com", Role::Student).await?;

    let promoted = update_user_access(
        &setup.db,
        &admin.id,
        &student.id,
        UserAccessUpdate {
            role: Some(Role::Editor),
            is_active: None,
        },
    )
    .await?;
    assert_eq!(promoted.role, Role::Editor);
    assert!(promoted.is_active);

    let users = list_users(&setup.db).await?;
    assert_eq!(users.len(), 2);

    let missing = update_user_access(
        &setup.db,
        &admin.id,
        "no-such-user",
        UserAccessUpdate::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(missing, CoreAccessError::NotFound(_)));
    Ok(())
}
