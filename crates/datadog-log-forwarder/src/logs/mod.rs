// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

pub mod batcher;
pub mod client;
pub mod constants;
pub mod decoder;
pub mod pipeline;
pub mod processor;

/// Per-invocation data provided by the Lambda runtime.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InvocationContext {
    pub request_id: String,
    pub invoked_function_arn: Option<String>,
}

impl InvocationContext {
    /// Region of the forwarder itself, the fourth field of its ARN.
    #[must_use]
    pub fn region(&self) -> Option<&str> {
        self.invoked_function_arn
            .as_deref()
            .and_then(|arn| arn.split(':').nth(3))
            .filter(|region| !region.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_from_arn() {
        let context = InvocationContext {
            request_id: String::new(),
            invoked_function_arn: Some("arn:aws:lambda:eu-west-1:123:function:fwd".to_string()),
        };
        assert_eq!(context.region(), Some("eu-west-1"));
    }

    #[test]
    fn test_region_missing() {
        assert_eq!(InvocationContext::default().region(), None);
        let context = InvocationContext {
            request_id: String::new(),
            invoked_function_arn: Some("not-an-arn".to_string()),
        };
        assert_eq!(context.region(), None);
    }
}
