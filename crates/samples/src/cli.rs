//! Command-line arguments shared by the sample programs.

use std::path::PathBuf;

use clap::{ArgAction, ArgGroup, Args, Parser};
use datamanager_common::protocol::{AccountType, Destination, ProductAccount};

/// Accounts that make up the request destination.
#[derive(Debug, Clone, Args)]
pub struct AccountArgs {
    /// Account type of the operating account, e.g. GOOGLE_ADS.
    #[arg(long)]
    pub operating_account_type: AccountType,

    /// ID of the operating account.
    #[arg(long)]
    pub operating_account_id: String,

    /// Account type of the login account.
    #[arg(long, requires = "login_account_id")]
    pub login_account_type: Option<AccountType>,

    /// ID of the login account.
    #[arg(long, requires = "login_account_type")]
    pub login_account_id: Option<String>,

    /// Account type of the linked account.
    #[arg(long, requires = "linked_account_id")]
    pub linked_account_type: Option<AccountType>,

    /// ID of the linked account.
    #[arg(long, requires = "linked_account_type")]
    pub linked_account_id: Option<String>,

    /// Only validate the request without applying changes.
    #[arg(long, action = ArgAction::Set, default_value_t = true)]
    pub validate_only: bool,
}

impl AccountArgs {
    /// Build the destination for `product_destination_id` (audience or
    /// conversion action).
    pub fn destination(&self, product_destination_id: impl Into<String>) -> Destination {
        let account = |account_type: Option<AccountType>, account_id: &Option<String>| {
            account_type
                .zip(account_id.clone())
                .map(|(account_type, account_id)| ProductAccount {
                    account_type,
                    account_id,
                })
        };
        Destination {
            operating_account: ProductAccount {
                account_type: self.operating_account_type,
                account_id: self.operating_account_id.clone(),
            },
            login_account: account(self.login_account_type, &self.login_account_id),
            linked_account: account(self.linked_account_type, &self.linked_account_id),
            product_destination_id: product_destination_id.into(),
        }
    }
}

/// Optional envelope encryption of identifiers.
///
/// `--key-uri` needs exactly one of `--wip-provider` (Google Cloud KMS keys)
/// or `--role-arn` (AWS KMS keys).
#[derive(Debug, Clone, Default, Args)]
#[command(group(ArgGroup::new("kek_access").args(["wip_provider", "role_arn"])))]
pub struct EncryptionArgs {
    /// URI of the KEK: `gcp-kms://projects/.../cryptoKeys/<key>`,
    /// `aws-kms://<key ARN>`, or `local-kms://<key>`.
    #[arg(long, requires = "kek_access")]
    pub key_uri: Option<String>,

    /// Workload Identity Pool provider the API uses to unwrap the DEK, of the
    /// form projects/PROJECT_ID/locations/global/workloadIdentityPools/WIP_ID/providers/PROVIDER_ID.
    #[arg(long, requires = "key_uri")]
    pub wip_provider: Option<String>,

    /// ARN of the IAM role the API assumes to unwrap the DEK.
    #[arg(long, requires = "key_uri")]
    pub role_arn: Option<String>,

    /// Credentials file used to reach KMS: a service-account JSON file for
    /// Google Cloud, a credentials file for AWS. Ambient credentials when omitted.
    #[arg(long, requires = "key_uri")]
    pub kms_credentials: Option<PathBuf>,
}

/// Sends audience members from a CSV file to a destination.
#[derive(Debug, Parser)]
#[command(name = "ingest-audience-members", version)]
pub struct AudienceCli {
    #[command(flatten)]
    pub accounts: AccountArgs,

    /// ID of the destination audience.
    #[arg(long)]
    pub audience_id: String,

    /// CSV file with a header row of `email_*`, `phone_*`, and address columns.
    #[arg(long)]
    pub csv_file: PathBuf,

    #[command(flatten)]
    pub encryption: EncryptionArgs,
}

/// Sends conversion events from a JSON file to a destination.
#[derive(Debug, Parser)]
#[command(name = "ingest-events", version)]
pub struct EventsCli {
    #[command(flatten)]
    pub accounts: AccountArgs,

    /// ID of the conversion action.
    #[arg(long)]
    pub conversion_action_id: u64,

    /// JSON file containing an array of events.
    #[arg(long)]
    pub json_file: PathBuf,

    #[command(flatten)]
    pub encryption: EncryptionArgs,
}
