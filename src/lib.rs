pub(crate) mod data {
    pub(crate) mod datasources {
        pub(crate) mod receipt_datasource;
        pub(crate) mod trusted_root_datasource;
    }
    pub(crate) mod der {
        pub(crate) mod der_cursor;
        #[cfg(test)]
        pub(crate) mod der_test_utils;
        pub(crate) mod der_value;
    }
    pub(crate) mod models {
        pub(crate) mod raw_attribute_model;
        pub(crate) mod receipt_fields;
    }
    pub(crate) mod parsers {
        pub(crate) mod attribute_payload_parser;
    }
    pub(crate) mod pkcs7 {
        pub(crate) mod signature_verifier;
        pub(crate) mod signed_data_extractor;
    }
    pub(crate) mod repositories {
        pub(crate) mod receipt_repository_impl;
    }
    pub(crate) mod validators {
        pub(crate) mod device_binding_validator;
    }
}

pub mod domain {
    pub mod entities {
        pub mod app_receipt;
        pub(crate) mod app_store_date;
        pub mod device_identifier;
        pub mod purchase_entry;
        pub mod validation_outcome;
    }
    pub mod repositories {
        pub mod receipt_repository;
    }
    pub mod validators {
        pub mod receipt_validator;
    }
}

pub mod config;
pub mod constants;
pub mod errors;
pub mod util;

pub use config::{ConfigError, ValidatorConfig};
pub use data::datasources::{
    receipt_datasource::{FileReceiptDatasource, InMemoryReceiptDatasource, ReceiptDatasource},
    trusted_root_datasource::TrustedRoot,
};
pub use data::repositories::receipt_repository_impl::ReceiptRepositoryImpl;
pub use domain::{
    entities::{
        app_receipt::AppReceipt, device_identifier::DeviceIdentifier,
        purchase_entry::PurchaseEntry, validation_outcome::ValidationOutcome,
    },
    repositories::receipt_repository::ReceiptRepository,
    validators::receipt_validator::ReceiptValidator,
};
pub use errors::ReceiptError;
pub use util::{validate_receipt_data, LocalReceiptValidator};
