use std::fmt;

/// Semantic fields derived from each log event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldName {
    Hostname,
    Source,
    Application,
    User,
    Method,
    Version,
    Url,
    Type,
    StatusCode,
    CorrelationId,
    Category,
    Cookies,
    Form,
    QueryString,
    Headers,
}

impl FieldName {
    pub const ALL: [FieldName; 15] = [
        FieldName::Hostname,
        FieldName::Source,
        FieldName::Application,
        FieldName::User,
        FieldName::Method,
        FieldName::Version,
        FieldName::Url,
        FieldName::Type,
        FieldName::StatusCode,
        FieldName::CorrelationId,
        FieldName::Category,
        FieldName::Cookies,
        FieldName::Form,
        FieldName::QueryString,
        FieldName::Headers,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldName::Hostname => "hostname",
            FieldName::Source => "source",
            FieldName::Application => "application",
            FieldName::User => "user",
            FieldName::Method => "method",
            FieldName::Version => "version",
            FieldName::Url => "url",
            FieldName::Type => "type",
            FieldName::StatusCode => "statusCode",
            FieldName::CorrelationId => "correlationId",
            FieldName::Category => "category",
            FieldName::Cookies => "cookies",
            FieldName::Form => "form",
            FieldName::QueryString => "querystring",
            FieldName::Headers => "headers",
        }
    }

    /// Historical spellings under which producers supply this field.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            FieldName::Hostname => &["hostname", "Hostname", "HostName", "hostName"],
            FieldName::Source => &["source", "Source"],
            FieldName::Application => &["application", "Application"],
            FieldName::User => &["user", "User"],
            FieldName::Method => &["method", "Method"],
            FieldName::Version => &["version", "Version"],
            FieldName::Url => &["url", "Url", "URL"],
            FieldName::Type => &["type", "Type"],
            FieldName::StatusCode => &["statuscode", "Statuscode", "statusCode", "StatusCode"],
            FieldName::CorrelationId => &[
                "correlationid",
                "correlationId",
                "CorrelationId",
                "CorrelationID",
            ],
            FieldName::Category => &["category", "Category"],
            FieldName::Cookies => &["cookies", "Cookies"],
            FieldName::Form => &["form", "Form"],
            FieldName::QueryString => &["querystring", "queryString", "QueryString", "Querystring"],
            FieldName::Headers => &[
                "servervariables",
                "serverVariables",
                "ServerVariables",
                "Servervariables",
            ],
        }
    }

    /// Whether the ambient context tiers are consulted for this field.
    pub fn reads_context(&self) -> bool {
        !matches!(
            self,
            FieldName::Version
                | FieldName::Cookies
                | FieldName::Form
                | FieldName::QueryString
                | FieldName::Headers
        )
    }

    /// Values the hosting framework can supply for this field, in order.
    pub fn host_values(&self) -> &'static [HostValue] {
        match self {
            FieldName::Hostname => &[HostValue::RequestHost, HostValue::MachineName],
            FieldName::User => &[HostValue::RequestUser, HostValue::ProcessUser],
            FieldName::Method => &[HostValue::RequestMethod],
            FieldName::Url => &[HostValue::RequestUrl],
            FieldName::StatusCode => &[HostValue::ResponseStatusCode],
            FieldName::CorrelationId => &[HostValue::RequestCorrelationId],
            FieldName::Cookies => &[HostValue::RequestCookies],
            FieldName::Form => &[HostValue::RequestForm],
            FieldName::QueryString => &[HostValue::RequestQueryString],
            FieldName::Headers => &[HostValue::RequestHeaders],
            FieldName::Source
            | FieldName::Application
            | FieldName::Version
            | FieldName::Type
            | FieldName::Category => &[],
        }
    }

    pub fn is_multi_value(&self) -> bool {
        matches!(
            self,
            FieldName::Cookies | FieldName::Form | FieldName::QueryString | FieldName::Headers
        )
    }

    /// The ordered sources tried for this field before any hard-coded fallback.
    pub fn source_chain(&self) -> Vec<FieldSource> {
        let aliases = self.aliases();
        let mut chain = Vec::with_capacity(aliases.len() * 2 + 3);

        // Property lookup ignores case, so one step covers every alias.
        chain.push(FieldSource::EventProperty(aliases[0]));
        if self.reads_context() {
            chain.extend(aliases.iter().copied().map(FieldSource::Scoped));
            chain.extend(aliases.iter().copied().map(FieldSource::Global));
        }
        chain.extend(self.host_values().iter().copied().map(FieldSource::Host));
        chain
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of a field's resolution chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
    /// Structured property on the event (case-insensitive).
    EventProperty(&'static str),
    /// Thread or span scoped diagnostic context.
    Scoped(&'static str),
    /// Process-wide diagnostic context.
    Global(&'static str),
    /// Value supplied by the hosting framework.
    Host(HostValue),
}

/// Values a hosting framework may know about the current request or process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostValue {
    RequestHost,
    MachineName,
    RequestUser,
    ProcessUser,
    RequestMethod,
    RequestUrl,
    ResponseStatusCode,
    RequestCorrelationId,
    RequestCookies,
    RequestForm,
    RequestQueryString,
    RequestHeaders,
}
