//! Sets up the per-run encrypter from the command-line arguments.

use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use datamanager_common::protocol::{AwsWrappedKeyInfo, EncryptionInfo, GcpWrappedKeyInfo, KeyType};
use datamanager_util::kms::{AWS_KMS_PREFIX, GCP_KMS_PREFIX, LOCAL_KMS_PREFIX};
use datamanager_util::{Encrypter, LocalKmsClient};
use tracing::info;

use crate::cli::EncryptionArgs;

/// An encrypter and the request field that lets the API unwrap its DEK.
#[derive(Debug)]
pub struct EncryptionSession {
    pub encrypter: Encrypter,
    pub info: EncryptionInfo,
}

/// How the API reaches the KEK to unwrap the DEK.
enum KekAccess<'a> {
    WipProvider(&'a str),
    RoleArn(&'a str),
}

/// Build the session when `--key-uri` is given with its WIP provider or role
/// ARN; `None` when no encryption flag is set.
///
/// `gcp-kms://` keys need a WIP provider and `aws-kms://` keys a role ARN.
/// `local-kms://` keys accept either.
///
/// # Errors
///
/// Fails if the flags are not paired, the key URI scheme is not supported or
/// does not match the access flag, or the KMS cannot be reached.
pub async fn setup(args: &EncryptionArgs) -> Result<Option<EncryptionSession>> {
    let access = match (&args.wip_provider, &args.role_arn) {
        (Some(wip_provider), None) => Some(KekAccess::WipProvider(wip_provider)),
        (None, Some(role_arn)) => Some(KekAccess::RoleArn(role_arn)),
        (None, None) => None,
        (Some(_), Some(_)) => bail!("must specify only one of WIP provider and role ARN"),
    };
    let (key_uri, access) = match (&args.key_uri, access) {
        (Some(key_uri), Some(access)) => (key_uri, access),
        (None, None) => return Ok(None),
        _ => bail!("must specify either both or neither of key URI and WIP provider (or role ARN)"),
    };
    let credentials = args.kms_credentials.as_deref();

    let encrypter = if key_uri.starts_with(GCP_KMS_PREFIX) {
        if !matches!(access, KekAccess::WipProvider(_)) {
            bail!("a {GCP_KMS_PREFIX} key URI requires a WIP provider");
        }
        Encrypter::create_for_gcp_kms(key_uri, credentials)
            .await
            .context("failed to create encrypter for Google Cloud KMS key")?
    } else if key_uri.starts_with(AWS_KMS_PREFIX) {
        if !matches!(access, KekAccess::RoleArn(_)) {
            bail!("an {AWS_KMS_PREFIX} key URI requires a role ARN");
        }
        Encrypter::create_for_aws_kms(key_uri, credentials)
            .await
            .context("failed to create encrypter for AWS KMS key")?
    } else if key_uri.starts_with(LOCAL_KMS_PREFIX) {
        Encrypter::create(&LocalKmsClient::new(), key_uri)
            .await
            .context("failed to create encrypter for local key")?
    } else {
        bail!("key URI must start with {GCP_KMS_PREFIX}, {AWS_KMS_PREFIX} or {LOCAL_KMS_PREFIX}");
    };

    let encrypted_dek = STANDARD.encode(encrypter.encrypted_dek_bytes());
    let info = match access {
        KekAccess::WipProvider(wip_provider) => EncryptionInfo::GcpWrappedKeyInfo(GcpWrappedKeyInfo {
            key_type: KeyType::Xchacha20Poly1305,
            wip_provider: wip_provider.to_owned(),
            kek_uri: key_uri.clone(),
            encrypted_dek,
        }),
        KekAccess::RoleArn(role_arn) => EncryptionInfo::AwsWrappedKeyInfo(AwsWrappedKeyInfo {
            key_type: KeyType::Xchacha20Poly1305,
            role_arn: role_arn.to_owned(),
            kek_uri: key_uri.clone(),
            encrypted_dek,
        }),
    };
    info!(key_id = encrypter.key_id(), "encryption enabled");
    Ok(Some(EncryptionSession { encrypter, info }))
}
