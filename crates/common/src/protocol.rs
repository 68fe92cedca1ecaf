//! Request types for the ingestion API, shaped like its JSON representation.
//!
//! Only the request side is modelled. The sample programs build these values
//! from formatted identifiers and serialise them with `serde_json`.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::DataManagerError;

// ---------------------------------------------------------------------------
// Accounts and destinations
// ---------------------------------------------------------------------------

/// Kind of product account a destination refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    GoogleAds,
    DisplayVideoPartner,
    DisplayVideoAdvertiser,
    DataPartner,
}

impl AccountType {
    /// Wire name, e.g. `"GOOGLE_ADS"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::GoogleAds => "GOOGLE_ADS",
            AccountType::DisplayVideoPartner => "DISPLAY_VIDEO_PARTNER",
            AccountType::DisplayVideoAdvertiser => "DISPLAY_VIDEO_ADVERTISER",
            AccountType::DataPartner => "DATA_PARTNER",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = DataManagerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GOOGLE_ADS" => Ok(AccountType::GoogleAds),
            "DISPLAY_VIDEO_PARTNER" => Ok(AccountType::DisplayVideoPartner),
            "DISPLAY_VIDEO_ADVERTISER" => Ok(AccountType::DisplayVideoAdvertiser),
            "DATA_PARTNER" => Ok(AccountType::DataPartner),
            _ => Err(DataManagerError::InvalidInput("unknown account type")),
        }
    }
}

/// An account identified by type and ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductAccount {
    pub account_type: AccountType,
    pub account_id: String,
}

/// Where ingested data is sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    pub operating_account: ProductAccount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login_account: Option<ProductAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_account: Option<ProductAccount>,
    /// Audience ID or conversion action ID.
    pub product_destination_id: String,
}

// ---------------------------------------------------------------------------
// User data
// ---------------------------------------------------------------------------

/// Formatted and hashed address components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressInfo {
    pub given_name: String,
    pub family_name: String,
    pub region_code: String,
    pub postal_code: String,
}

/// A single identifier for a user. Serialises as a one-key object, e.g.
/// `{"emailAddress": "<hash>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UserIdentifier {
    EmailAddress(String),
    PhoneNumber(String),
    Address(AddressInfo),
}

/// All identifiers known for one user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    pub user_identifiers: Vec<UserIdentifier>,
}

impl UserData {
    pub fn is_empty(&self) -> bool {
        self.user_identifiers.is_empty()
    }
}

/// One member of a Customer Match audience.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudienceMember {
    pub user_data: UserData,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdIdentifiers {
    pub gclid: String,
}

/// A conversion event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// RFC 3339 timestamp in UTC.
    pub event_timestamp: String,
    pub transaction_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ad_identifiers: Option<AdIdentifiers>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversion_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data: Option<UserData>,
}

// ---------------------------------------------------------------------------
// Request envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsentStatus {
    ConsentGranted,
    ConsentDenied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Consent {
    pub ad_user_data: ConsentStatus,
    pub ad_personalization: ConsentStatus,
}

impl Consent {
    /// Consent granted for both user data and personalization.
    pub fn granted() -> Self {
        Self {
            ad_user_data: ConsentStatus::ConsentGranted,
            ad_personalization: ConsentStatus::ConsentGranted,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TermsOfServiceStatus {
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermsOfService {
    pub customer_match_terms_of_service_status: TermsOfServiceStatus,
}

/// Encoding of hashed identifiers declared on the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WireEncoding {
    Hex,
    Base64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KeyType {
    Xchacha20Poly1305,
}

/// Wrapped DEK information for a KEK held in Google Cloud KMS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GcpWrappedKeyInfo {
    pub key_type: KeyType,
    /// Workload Identity Pool provider the API uses to reach the KEK, of the
    /// form `projects/<id>/locations/global/workloadIdentityPools/<pool>/providers/<provider>`.
    pub wip_provider: String,
    pub kek_uri: String,
    /// Base64-encoded encrypted DEK.
    pub encrypted_dek: String,
}

/// Wrapped DEK information for a KEK held in AWS KMS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsWrappedKeyInfo {
    pub key_type: KeyType,
    pub role_arn: String,
    pub kek_uri: String,
    /// Base64-encoded encrypted DEK.
    pub encrypted_dek: String,
}

/// Where the wrapped DEK's KEK lives. Serialized as a single-key object,
/// `{"gcpWrappedKeyInfo": {..}}` or `{"awsWrappedKeyInfo": {..}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EncryptionInfo {
    GcpWrappedKeyInfo(GcpWrappedKeyInfo),
    AwsWrappedKeyInfo(AwsWrappedKeyInfo),
}

impl EncryptionInfo {
    pub fn kek_uri(&self) -> &str {
        match self {
            EncryptionInfo::GcpWrappedKeyInfo(info) => &info.kek_uri,
            EncryptionInfo::AwsWrappedKeyInfo(info) => &info.kek_uri,
        }
    }

    /// Base64-encoded encrypted DEK.
    pub fn encrypted_dek(&self) -> &str {
        match self {
            EncryptionInfo::GcpWrappedKeyInfo(info) => &info.encrypted_dek,
            EncryptionInfo::AwsWrappedKeyInfo(info) => &info.encrypted_dek,
        }
    }
}

/// Body of an audience member ingestion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestAudienceMembersRequest {
    pub destinations: Vec<Destination>,
    pub audience_members: Vec<AudienceMember>,
    pub consent: Consent,
    pub terms_of_service: TermsOfService,
    pub encoding: WireEncoding,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_info: Option<EncryptionInfo>,
    pub validate_only: bool,
}

/// Body of an event ingestion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestEventsRequest {
    pub destinations: Vec<Destination>,
    pub events: Vec<Event>,
    pub consent: Consent,
    pub encoding: WireEncoding,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_info: Option<EncryptionInfo>,
    pub validate_only: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn account_type_parses_case_insensitively() {
        assert_eq!(
            "google_ads".parse::<AccountType>().unwrap(),
            AccountType::GoogleAds
        );
        assert_eq!(
            " DATA_PARTNER ".parse::<AccountType>().unwrap(),
            AccountType::DataPartner
        );
        assert!("ADS".parse::<AccountType>().is_err());
    }

    #[test]
    fn user_identifier_serialises_as_single_key_object() {
        let id = UserIdentifier::EmailAddress("abc".into());
        assert_eq!(serde_json::to_value(&id).unwrap(), json!({"emailAddress": "abc"}));
    }

    #[test]
    fn audience_request_json_shape() {
        let req = IngestAudienceMembersRequest {
            destinations: vec![Destination {
                operating_account: ProductAccount {
                    account_type: AccountType::GoogleAds,
                    account_id: "123".into(),
                },
                login_account: None,
                linked_account: None,
                product_destination_id: "456".into(),
            }],
            audience_members: vec![AudienceMember {
                user_data: UserData {
                    user_identifiers: vec![UserIdentifier::PhoneNumber("ff".into())],
                },
            }],
            consent: Consent::granted(),
            terms_of_service: TermsOfService {
                customer_match_terms_of_service_status: TermsOfServiceStatus::Accepted,
            },
            encoding: WireEncoding::Hex,
            encryption_info: None,
            validate_only: true,
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["destinations"][0]["operatingAccount"]["accountType"], "GOOGLE_ADS");
        assert!(v["destinations"][0].get("loginAccount").is_none());
        assert_eq!(v["consent"]["adUserData"], "CONSENT_GRANTED");
        assert_eq!(
            v["termsOfService"]["customerMatchTermsOfServiceStatus"],
            "ACCEPTED"
        );
        assert_eq!(v["encoding"], "HEX");
        assert!(v.get("encryptionInfo").is_none());
        assert_eq!(v["audienceMembers"][0]["userData"]["userIdentifiers"][0]["phoneNumber"], "ff");
    }

    #[test]
    fn encryption_info_is_tagged_by_provider() {
        let gcp = EncryptionInfo::GcpWrappedKeyInfo(GcpWrappedKeyInfo {
            key_type: KeyType::Xchacha20Poly1305,
            wip_provider: "projects/1/locations/global/workloadIdentityPools/p/providers/q".into(),
            kek_uri: "gcp-kms://projects/p/locations/l/keyRings/r/cryptoKeys/k".into(),
            encrypted_dek: "ZGVr".into(),
        });
        assert_eq!(
            serde_json::to_value(&gcp).unwrap(),
            json!({"gcpWrappedKeyInfo": {
                "keyType": "XCHACHA20_POLY1305",
                "wipProvider": "projects/1/locations/global/workloadIdentityPools/p/providers/q",
                "kekUri": "gcp-kms://projects/p/locations/l/keyRings/r/cryptoKeys/k",
                "encryptedDek": "ZGVr",
            }})
        );
        assert_eq!(gcp.encrypted_dek(), "ZGVr");

        let aws = EncryptionInfo::AwsWrappedKeyInfo(AwsWrappedKeyInfo {
            key_type: KeyType::Xchacha20Poly1305,
            role_arn: "arn:aws:iam::1:role/r".into(),
            kek_uri: "aws-kms://arn:aws:kms:us-east-1:1:key/k".into(),
            encrypted_dek: "ZGVr".into(),
        });
        let v = serde_json::to_value(&aws).unwrap();
        assert_eq!(v["awsWrappedKeyInfo"]["roleArn"], "arn:aws:iam::1:role/r");
        assert!(v.get("gcpWrappedKeyInfo").is_none());
        assert_eq!(aws.kek_uri(), "aws-kms://arn:aws:kms:us-east-1:1:key/k");
    }

    #[test]
    fn key_type_wire_name() {
        assert_eq!(
            serde_json::to_value(KeyType::Xchacha20Poly1305).unwrap(),
            json!("XCHACHA20_POLY1305")
        );
    }
}
