use crate::error::ExecError;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One outbound call, described before it is routed.
///
/// The path template uses `{}` placeholders filled positionally by `params`,
/// e.g. `/api/pmu/{}/R{}` with `["17102026", "1"]`. A descriptor is
/// immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    endpoint: &'static str,
    method: Method,
    template: &'static str,
    params: Vec<String>,
    query: Vec<(String, String)>,
    body: Option<Value>,
    timeout: Duration,
}

impl RequestDescriptor {
    pub fn builder(endpoint: &'static str, method: Method, template: &'static str) -> RequestBuilder {
        RequestBuilder {
            inner: RequestDescriptor {
                endpoint,
                method,
                template,
                params: Vec::new(),
                query: Vec::new(),
                body: None,
                timeout: Duration::from_millis(crate::config::DEFAULT_TIMEOUT_MS),
            },
        }
    }

    pub fn get(endpoint: &'static str, template: &'static str) -> RequestBuilder {
        Self::builder(endpoint, Method::Get, template)
    }

    pub fn post(endpoint: &'static str, template: &'static str) -> RequestBuilder {
        Self::builder(endpoint, Method::Post, template)
    }

    pub fn delete(endpoint: &'static str, template: &'static str) -> RequestBuilder {
        Self::builder(endpoint, Method::Delete, template)
    }

    pub fn endpoint(&self) -> &'static str {
        self.endpoint
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fill the template's placeholders in order.
    pub fn path(&self) -> Result<String, ExecError> {
        let mut out = String::with_capacity(self.template.len() + 16);
        let mut params = self.params.iter();
        let mut pieces = self.template.split("{}");

        if let Some(first) = pieces.next() {
            out.push_str(first);
        }
        for piece in pieces {
            let param = params.next().ok_or_else(|| {
                ExecError::Config(format!(
                    "{}: template {} has more placeholders than parameters",
                    self.endpoint, self.template
                ))
            })?;
            out.push_str(param);
            out.push_str(piece);
        }
        if params.next().is_some() {
            return Err(ExecError::Config(format!(
                "{}: too many parameters for template {}",
                self.endpoint, self.template
            )));
        }
        Ok(out)
    }
}

pub struct RequestBuilder {
    inner: RequestDescriptor,
}

impl RequestBuilder {
    pub fn param(mut self, value: impl ToString) -> Self {
        self.inner.params.push(value.to_string());
        self
    }

    pub fn query(mut self, name: &str, value: impl ToString) -> Self {
        self.inner.query.push((name.to_string(), value.to_string()));
        self
    }

    /// Adds the parameter only when a value is present.
    pub fn query_opt<T: ToString>(self, name: &str, value: Option<T>) -> Self {
        match value {
            Some(v) => self.query(name, v),
            None => self,
        }
    }

    pub fn json(mut self, body: Value) -> Self {
        self.inner.body = Some(body);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.inner.timeout = timeout;
        self
    }

    pub fn build(self) -> RequestDescriptor {
        self.inner
    }
}
