//! Object and field names of the bookkeeping records.
//!
//! Custom names are written without a namespace here and qualified with
//! [`Schema::name`], since the same objects exist both unmanaged and inside
//! the managed package.

/// Prefix of the managed package that ships the bookkeeping objects.
pub const MANAGED_NAMESPACE: &str = "KicksawEng__";

pub const INTEGRATION: &str = "Integration__c";
/// Standard field, never prefixed.
pub const INTEGRATION_NAME: &str = "Name";
pub const LAUNCHER_NAME: &str = "LambdaName__c";

pub const EXECUTION: &str = "IntegrationExecution__c";
/// Lookup from Execution to Integration.
pub const EXECUTION_INTEGRATION: &str = "Integration__c";
pub const EXECUTION_PAYLOAD: &str = "ExecutionPayload__c";
pub const SUCCESSFUL_COMPLETION: &str = "SuccessfulCompletion__c";
pub const EXECUTION_ERROR_MESSAGE: &str = "ErrorMessage__c";
pub const RESPONSE_PAYLOAD: &str = "ResponsePayload__c";

pub const LOG: &str = "IntegrationLog__c";
pub const LOG_MESSAGE: &str = "Message__c";
pub const LOG_LEVEL: &str = "LogLevel__c";
pub const LOG_PARENT: &str = "ParentExecution__c";

pub const ERROR: &str = "IntegrationError__c";
/// Lookup from Error to Execution.
pub const ERROR_EXECUTION: &str = "IntegrationExecution__c";
pub const OPERATION: &str = "Operation__c";
pub const SALESFORCE_OBJECT: &str = "SalesforceObject__c";
pub const ERROR_CODE: &str = "ErrorCode__c";
pub const ERROR_MESSAGE: &str = "ErrorMessage__c";
pub const UPSERT_KEY: &str = "UpsertKey__c";
pub const UPSERT_KEY_VALUE: &str = "UpsertKeyValue__c";
pub const OBJECT_PAYLOAD: &str = "ObjectPayload__c";

/// Resolves bookkeeping names under one namespace prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    namespace: String,
}

impl Schema {
    /// `namespace` is `""` or a package prefix ending in `__`.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    /// Objects deployed without a package.
    pub fn unmanaged() -> Self {
        Self::default()
    }

    pub fn managed() -> Self {
        Self::new(MANAGED_NAMESPACE)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Qualify a custom object or field name.
    pub fn name(&self, base: &str) -> String {
        format!("{}{}", self.namespace, base)
    }
}
