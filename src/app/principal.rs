//! Canonicalization of CloudTrail `userIdentity` blocks into principal
//! strings.
//!
//! CloudTrail describes the caller of an API in a dozen different shapes,
//! each with its own set of sub-fields. This module collapses them into
//! one stable string per logical actor, so that activity counts keyed by
//! principal line up across records. Session-scoped identities (web
//! identity, SAML) keep their session detail because no stable role or
//! user exists behind them; role sessions collapse onto the role itself.

use super::errors::{RecordError, RecordResult};
use super::record::{ActivityRecord, UserIdentity};

/// The known `userIdentity.type` values, plus `Untyped` for records whose
/// identity block carries no `type` field at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentityKind {
    Untyped,
    IamUser,
    AssumedRole,
    Root,
    AwsAccount,
    AwsService,
    FederatedUser,
    IdentityCenterUser,
    WebIdentityUser,
    SamlUser,
    Unknown,
    Directory,
}

impl IdentityKind {
    pub fn from_tag(tag: &str) -> RecordResult<Self> {
        Ok(match tag {
            "IAMUser" => IdentityKind::IamUser,
            "AssumedRole" => IdentityKind::AssumedRole,
            "Root" => IdentityKind::Root,
            "AWSAccount" => IdentityKind::AwsAccount,
            "AWSService" => IdentityKind::AwsService,
            "FederatedUser" => IdentityKind::FederatedUser,
            "IdentityCenterUser" => IdentityKind::IdentityCenterUser,
            "WebIdentityUser" => IdentityKind::WebIdentityUser,
            "SAMLUser" => IdentityKind::SamlUser,
            "Unknown" => IdentityKind::Unknown,
            "Directory" => IdentityKind::Directory,
            other => {
                return Err(RecordError::UnrecognizedIdentityKind {
                    kind: other.to_string(),
                })
            }
        })
    }

    pub fn from_identity(identity: &UserIdentity) -> RecordResult<Self> {
        match identity.identity_type.as_deref() {
            Some(tag) => IdentityKind::from_tag(tag),
            None => Ok(IdentityKind::Untyped),
        }
    }
}

/// Resolves the principal behind one log record.
pub fn principal_for_record(record: &ActivityRecord) -> RecordResult<String> {
    let identity = record
        .user_identity
        .as_ref()
        .ok_or_else(|| RecordError::malformed("userIdentity"))?;
    resolve_principal(identity)
}

/// Canonicalizes a `userIdentity` block into a principal string, for
/// example:
///
/// ```text
/// IAMUser    {accountId: "111122223333", userName: "alice"}
///            -> "111122223333:user/alice"
/// AssumedRole{arn: "arn:aws:sts::111122223333:assumed-role/Ops/s1", ...}
///            -> "111122223333:role/Ops"
/// AWSService {invokedBy: "eks.amazonaws.com"}
///            -> "eks.amazonaws.com"
/// ```
///
/// The same identity block always resolves to the same string. Errors
/// denote either an identity type this tool does not know or a block
/// missing a sub-field its type requires; the `Unknown` type is the one
/// branch that never fails and instead degrades through fallbacks.
pub fn resolve_principal(identity: &UserIdentity) -> RecordResult<String> {
    match IdentityKind::from_identity(identity)? {
        IdentityKind::Untyped | IdentityKind::AwsAccount => invoked_by_or_account(identity),
        IdentityKind::IamUser => iam_user_principal(identity),
        IdentityKind::AssumedRole => assumed_role_principal(identity),
        IdentityKind::Root => root_principal(identity),
        IdentityKind::AwsService => aws_service_principal(identity),
        IdentityKind::FederatedUser => federated_user_principal(identity),
        IdentityKind::IdentityCenterUser => identity_center_user_principal(identity),
        IdentityKind::WebIdentityUser => web_identity_user_principal(identity),
        IdentityKind::SamlUser => saml_user_principal(identity),
        IdentityKind::Unknown => Ok(unknown_principal(identity)),
        IdentityKind::Directory => directory_principal(identity),
    }
}

fn required<'a>(value: &'a Option<String>, field: &str) -> RecordResult<&'a str> {
    value.as_deref().ok_or_else(|| RecordError::malformed(field))
}

/// Calls made by services on the account's behalf carry an `invokedBy`
/// service label; plain cross-account or untyped records fall back to the
/// bare account id.
fn invoked_by_or_account(identity: &UserIdentity) -> RecordResult<String> {
    if let Some(invoked_by) = identity.invoked_by.as_deref() {
        return Ok(invoked_by.to_string());
    }
    Ok(required(&identity.account_id, "userIdentity.accountId")?.to_string())
}

fn iam_user_principal(identity: &UserIdentity) -> RecordResult<String> {
    let account = required(&identity.account_id, "userIdentity.accountId")?;
    let user_name = required(&identity.user_name, "userIdentity.userName")?;
    Ok(format!("{}:user/{}", account, user_name))
}

fn assumed_role_principal(identity: &UserIdentity) -> RecordResult<String> {
    let issuer_arn = identity
        .session_context
        .as_ref()
        .and_then(|context| context.session_issuer.as_ref())
        .and_then(|issuer| issuer.arn.as_deref());
    let arn = match issuer_arn {
        Some(arn) => arn,
        None => required(&identity.arn, "userIdentity.arn")?,
    };
    let account = required(&identity.account_id, "userIdentity.accountId")?;
    role_principal(account, arn)
}

/// Extracts the role name from a role ARN. Assumed-role ARNs carry a
/// trailing session name, so the role name sits second to last there and
/// last in plain role ARNs. Role names may themselves contain colons
/// (e.g. `role/aws:ec2-instance`), hence position from the end rather
/// than any further parsing.
fn role_principal(account: &str, arn: &str) -> RecordResult<String> {
    if arn.contains(":assumed-role/") {
        let role = second_last_path_segment(arn)
            .ok_or_else(|| RecordError::malformed("userIdentity.arn"))?;
        Ok(format!("{}:role/{}", account, role))
    } else if arn.contains(":role/") {
        Ok(format!("{}:role/{}", account, last_path_segment(arn)))
    } else {
        Err(RecordError::malformed("userIdentity.arn"))
    }
}

fn root_principal(identity: &UserIdentity) -> RecordResult<String> {
    let account = required(&identity.account_id, "userIdentity.accountId")?;
    Ok(format!("{}:root", account))
}

fn aws_service_principal(identity: &UserIdentity) -> RecordResult<String> {
    Ok(required(&identity.invoked_by, "userIdentity.invokedBy")?.to_string())
}

/// Federated sessions canonicalize onto the identity that issued them:
/// the account root, or an IAM user named by the issuer ARN.
fn federated_user_principal(identity: &UserIdentity) -> RecordResult<String> {
    let issuer = identity
        .session_context
        .as_ref()
        .and_then(|context| context.session_issuer.as_ref())
        .ok_or_else(|| RecordError::malformed("userIdentity.sessionContext.sessionIssuer"))?;
    let account = required(&identity.account_id, "userIdentity.accountId")?;
    if issuer.issuer_type.as_deref() == Some("Root") {
        return Ok(format!("{}:root", account));
    }
    let issuer_arn = required(&issuer.arn, "userIdentity.sessionContext.sessionIssuer.arn")?;
    Ok(format!("{}:user/{}", account, last_path_segment(issuer_arn)))
}

fn identity_center_user_principal(identity: &UserIdentity) -> RecordResult<String> {
    let account = required(&identity.account_id, "userIdentity.accountId")?;
    let on_behalf_of = identity
        .on_behalf_of
        .as_ref()
        .ok_or_else(|| RecordError::malformed("userIdentity.onBehalfOf"))?;
    let store_arn = required(
        &on_behalf_of.identity_store_arn,
        "userIdentity.onBehalfOf.identityStoreArn",
    )?;
    let user_id = required(&on_behalf_of.user_id, "userIdentity.onBehalfOf.userId")?;
    Ok(format!(
        "{}:identitycenteruser/{}/{}",
        account,
        last_path_segment(store_arn),
        user_id
    ))
}

/// Web identity principal ids look like
/// `arn:aws:iam::1111:oidc-provider/oidc.example.com:sub:name`; everything
/// after the first slash identifies the federated caller.
fn web_identity_user_principal(identity: &UserIdentity) -> RecordResult<String> {
    let principal_id = required(&identity.principal_id, "userIdentity.principalId")?;
    let (_, identifier) = principal_id
        .split_once('/')
        .ok_or_else(|| RecordError::malformed("userIdentity.principalId"))?;
    Ok(format!("oidc:{}", identifier))
}

fn saml_user_principal(identity: &UserIdentity) -> RecordResult<String> {
    let principal_id = required(&identity.principal_id, "userIdentity.principalId")?;
    Ok(format!("saml:{}", principal_id))
}

fn directory_principal(identity: &UserIdentity) -> RecordResult<String> {
    let account = required(&identity.account_id, "userIdentity.accountId")?;
    let arn = required(&identity.arn, "userIdentity.arn")?;
    let directory = second_last_path_segment(arn)
        .ok_or_else(|| RecordError::malformed("userIdentity.arn"))?;
    Ok(format!(
        "{}:ds/{}/{}",
        account,
        directory,
        last_path_segment(arn)
    ))
}

/// CloudTrail types an identity `Unknown` when it could not attribute the
/// call cleanly (deleted principals, some service-internal calls). The
/// block may still carry a usable ARN or identity-store reference, so
/// resolution degrades through fallbacks and always yields some string.
fn unknown_principal(identity: &UserIdentity) -> String {
    if let Some(principal) = arn_classified_principal(identity) {
        return principal;
    }
    if let Ok(principal) = identity_center_user_principal(identity) {
        return principal;
    }
    if let Some(invoked_by) = identity.invoked_by.as_deref() {
        return invoked_by.to_string();
    }
    if let Some(account) = identity.account_id.as_deref().filter(|id| !id.is_empty()) {
        return account.to_string();
    }
    identity
        .identity_type
        .clone()
        .unwrap_or_else(|| "Unknown".to_string())
}

fn arn_classified_principal(identity: &UserIdentity) -> Option<String> {
    let arn = identity.arn.as_deref().filter(|arn| !arn.is_empty())?;
    let account = identity.account_id.as_deref();
    if arn.ends_with(":root") {
        return Some(format!("{}:root", account?));
    }
    if arn.contains(":user/") || arn.contains(":federated-user/") {
        return Some(format!("{}:user/{}", account?, last_path_segment(arn)));
    }
    if arn.contains(":assumed-role/") {
        return Some(format!(
            "{}:role/{}",
            account?,
            second_last_path_segment(arn)?
        ));
    }
    if arn.contains(":role/") {
        return Some(format!("{}:role/{}", account?, last_path_segment(arn)));
    }
    None
}

fn last_path_segment(value: &str) -> &str {
    value.rsplit('/').next().unwrap_or(value)
}

fn second_last_path_segment(value: &str) -> Option<&str> {
    value.rsplit('/').nth(1)
}
