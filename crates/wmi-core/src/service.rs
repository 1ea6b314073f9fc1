//! Service - a connected namespace
//!
//! The entry point for queries, class-instance enumeration, object lookup and
//! method execution. Every [`Enum`] and [`Instance`] produced by a service
//! shares its [`Connection`]; once the service is closed they fail with
//! [`WmiError::HandleInvalid`].

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::enumerator::Enum;
use crate::error::{Status, WmiError, WmiResult};
use crate::instance::Instance;
use crate::mapper::{QueryTarget, Record};
use crate::method::MethodExecutor;
use crate::provider::{Handle, Provider};

/// Root namespace
pub const ROOT: &str = "ROOT";

/// Default namespace for the Win32 classes
pub const ROOT_CIMV2: &str = "ROOT\\CIMV2";

/// Normalize a namespace path: `/` becomes `\` and surrounding delimiters are
/// dropped.
pub fn normalize_namespace(path: &str) -> String {
    path.trim()
        .replace('/', "\\")
        .trim_matches('\\')
        .to_string()
}

// ============================================================================
// Connection
// ============================================================================

/// Namespace state shared by a service and everything it produced.
pub(crate) struct Connection {
    pub(crate) provider: Rc<dyn Provider>,
    namespace: Cell<Option<Handle>>,
    path: String,
}

impl Connection {
    pub(crate) fn namespace(&self) -> WmiResult<Handle> {
        self.namespace.get().ok_or(WmiError::HandleInvalid)
    }

    pub(crate) fn is_open(&self) -> bool {
        self.namespace.get().is_some()
    }

    pub(crate) fn path(&self) -> &str {
        &self.path
    }

    fn release(&self) {
        if let Some(handle) = self.namespace.take() {
            tracing::debug!(namespace = %self.path, "closing namespace");
            if let Err(err) = self.provider.release(handle) {
                tracing::warn!(namespace = %self.path, "failed to release namespace: {}", err);
            }
        }
    }
}

// ============================================================================
// Service
// ============================================================================

/// Handle to a connected namespace.
pub struct Service {
    conn: Rc<Connection>,
}

impl Service {
    /// Connect to a namespace such as `ROOT\CIMV2`.
    pub fn connect(provider: Rc<dyn Provider>, namespace: &str) -> WmiResult<Service> {
        let path = normalize_namespace(namespace);
        tracing::debug!(namespace = %path, "connecting");

        let handle = provider.connect(&path).map_err(|e| {
            e.lift(|source| WmiError::Connection {
                namespace: path.clone(),
                source,
            })
        })?;

        Ok(Service::from_handle(provider, handle, path))
    }

    fn from_handle(provider: Rc<dyn Provider>, handle: Handle, path: String) -> Service {
        Service {
            conn: Rc::new(Connection {
                provider,
                namespace: Cell::new(Some(handle)),
                path,
            }),
        }
    }

    /// Full namespace path
    pub fn namespace(&self) -> &str {
        self.conn.path()
    }

    /// Provider backing this service
    pub fn provider(&self) -> Rc<dyn Provider> {
        self.conn.provider.clone()
    }

    /// Whether the service has been closed
    pub fn is_closed(&self) -> bool {
        !self.conn.is_open()
    }

    /// Open a child namespace. The child has its own lifetime.
    pub fn open_namespace(&self, child: &str) -> WmiResult<Service> {
        let handle = self.conn.namespace()?;
        let child = normalize_namespace(child);
        let path = format!("{}\\{}", self.conn.path(), child);
        tracing::debug!(namespace = %path, "opening child namespace");

        let opened = self
            .conn
            .provider
            .open_namespace(handle, &child)
            .map_err(|e| {
                e.lift(|source| WmiError::Connection {
                    namespace: path.clone(),
                    source,
                })
            })?;

        Ok(Service::from_handle(self.conn.provider.clone(), opened, path))
    }

    // ========================================================================
    // Raw access
    // ========================================================================

    /// Run a query. Syntax errors are reported here, not during enumeration.
    pub fn exec_query(&self, query: &str) -> WmiResult<Enum> {
        let handle = self.conn.namespace()?;
        tracing::debug!(namespace = %self.conn.path(), query, "executing query");

        let enumerator = self.conn.provider.exec_query(handle, query).map_err(|e| {
            e.lift(|source| WmiError::QueryExecution {
                query: query.to_string(),
                source,
            })
        })?;

        Ok(Enum::new(self.conn.clone(), enumerator, query.to_string()))
    }

    /// Enumerate every instance of a class, subclasses included.
    pub fn create_instance_enum(&self, class: &str) -> WmiResult<Enum> {
        let handle = self.conn.namespace()?;
        tracing::debug!(namespace = %self.conn.path(), class, "enumerating instances");

        let enumerator = self
            .conn
            .provider
            .create_instance_enum(handle, class)
            .map_err(|e| {
                e.lift(|source| WmiError::QueryExecution {
                    query: class.to_string(),
                    source,
                })
            })?;

        Ok(Enum::new(self.conn.clone(), enumerator, class.to_string()))
    }

    /// Fetch a class definition (`Win32_Process`), a keyed instance
    /// (`Win32_Process.Handle="4"`) or a singleton (`Win32_OperatingSystem=@`).
    pub fn get_object(&self, path: &str) -> WmiResult<Instance> {
        let handle = self.conn.namespace()?;
        tracing::debug!(namespace = %self.conn.path(), path, "getting object");

        let object = self.conn.provider.get_object(handle, path).map_err(|e| {
            e.lift(|source| match source.status {
                Status::NOT_FOUND | Status::INVALID_CLASS | Status::INVALID_OBJECT_PATH => {
                    WmiError::ObjectNotFound {
                        path: path.to_string(),
                    }
                }
                _ => WmiError::Provider(source),
            })
        })?;

        Ok(Instance::from_raw(self.conn.clone(), object))
    }

    /// Execute a method and return its output parameters.
    pub fn exec_method(
        &self,
        path: &str,
        method: &str,
        input: Option<&Instance>,
    ) -> WmiResult<Instance> {
        let handle = self.conn.namespace()?;
        let input = input.map(Instance::live).transpose()?;
        tracing::debug!(namespace = %self.conn.path(), path, method, "executing method");

        let output = self
            .conn
            .provider
            .exec_method(handle, path, method, input)
            .map_err(|e| {
                e.lift(|source| WmiError::MethodInvocation {
                    path: path.to_string(),
                    method: method.to_string(),
                    source,
                })
            })?;

        Ok(Instance::from_raw(self.conn.clone(), output))
    }

    // ========================================================================
    // Typed access
    // ========================================================================

    /// Run a query and map the result into `target`.
    ///
    /// A single record takes the first row; a `Vec` gets one record per row
    /// appended, and only when every row mapped.
    pub fn query<T: QueryTarget>(&self, query: &str, target: &mut T) -> WmiResult<()> {
        let mut rows = self.exec_query(query)?;
        target.fill(&mut rows)
    }

    /// Map every instance of `class` and append them to `out`.
    pub fn class_instances<T: Record>(&self, class: &str, out: &mut Vec<T>) -> WmiResult<()> {
        let mut rows = self.create_instance_enum(class)?;
        out.fill(&mut rows)
    }

    /// Map every instance of the class a record is declared for.
    pub fn instances<T: Record>(&self) -> WmiResult<Vec<T>> {
        let class = T::CLASS.ok_or_else(|| {
            WmiError::UnsupportedType(format!(
                "{} does not declare a class",
                std::any::type_name::<T>()
            ))
        })?;
        let mut out = Vec::new();
        self.class_instances(class, &mut out)?;
        Ok(out)
    }

    /// Start a method call on the object at `path`.
    ///
    /// The signature is resolved right away; any failure is held by the
    /// executor and reported from `execute()` or `end()`.
    pub fn begin_method<'a>(&'a self, path: &str, method: &str) -> MethodExecutor<'a> {
        let mut executor = MethodExecutor::new(self, None, path, method);
        executor.begin();
        executor
    }

    /// Start a method call using an already fetched class or instance to
    /// resolve the signature.
    pub fn begin_method_on<'a>(
        &'a self,
        object: &'a Instance,
        path: &str,
        method: &str,
    ) -> MethodExecutor<'a> {
        let mut executor = MethodExecutor::new(self, Some(object), path, method);
        executor.begin();
        executor
    }

    /// Release the namespace. Safe to call more than once.
    pub fn close(&mut self) {
        self.conn.release();
    }
}

impl Drop for Service {
    fn drop(&mut self) {
        self.conn.release();
    }
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("namespace", &self.conn.path())
            .field("open", &self.conn.is_open())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{sample, MemoryProvider, Repository};

    #[test]
    fn test_normalize_namespace() {
        assert_eq!(normalize_namespace("root/cimv2"), "root\\cimv2");
        assert_eq!(normalize_namespace(" \\ROOT\\default\\ "), "ROOT\\default");
        assert_eq!(normalize_namespace("ROOT"), "ROOT");
    }

    #[test]
    fn test_connect_missing_namespace() {
        let err = Service::connect(sample::provider(), "ROOT\\Nowhere").unwrap_err();
        match err {
            WmiError::Connection { namespace, source } => {
                assert_eq!(namespace, "ROOT\\Nowhere");
                assert_eq!(source.status, Status::INVALID_NAMESPACE);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_connect_access_denied() {
        let repo = sample::repository();
        repo.deny_access("ROOT\\default");
        let provider: Rc<dyn Provider> = Rc::new(MemoryProvider::new(repo));

        let err = Service::connect(provider, "root/default").unwrap_err();
        assert_eq!(err.status(), Some(Status::ACCESS_DENIED));
    }

    #[test]
    fn test_open_namespace_independent_lifetime() {
        let mut root = Service::connect(sample::provider(), ROOT).unwrap();
        let cimv2 = root.open_namespace("cimv2").unwrap();
        root.close();

        assert!(root.is_closed());
        assert_eq!(cimv2.namespace(), "ROOT\\cimv2");
        let os = cimv2.get_object("Win32_OperatingSystem=@").unwrap();
        assert_eq!(os.class_name().unwrap(), "Win32_OperatingSystem");
    }

    #[test]
    fn test_query_syntax_error_is_immediate() {
        let service = Service::connect(sample::provider(), ROOT_CIMV2).unwrap();
        let err = service.exec_query("SELEC * FROM Win32_Process").unwrap_err();
        match err {
            WmiError::QueryExecution { query, source } => {
                assert_eq!(query, "SELEC * FROM Win32_Process");
                assert_eq!(source.status, Status::INVALID_QUERY);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_get_object_not_found() {
        let service = Service::connect(sample::provider(), ROOT_CIMV2).unwrap();
        for path in [
            "Win32_NoSuchClass",
            "Win32_Process.Handle=\"99999\"",
            "Win32_Process.=",
        ] {
            let err = service.get_object(path).unwrap_err();
            assert!(
                matches!(err, WmiError::ObjectNotFound { .. }),
                "{}: {:?}",
                path,
                err
            );
        }
    }

    #[test]
    fn test_exec_method_failure_carries_status() {
        let service = Service::connect(sample::provider(), ROOT_CIMV2).unwrap();
        let err = service
            .exec_method("Win32_OperatingSystem=@", "NoSuchMethod", None)
            .unwrap_err();
        match err {
            WmiError::MethodInvocation { method, source, .. } => {
                assert_eq!(method, "NoSuchMethod");
                assert_eq!(source.status, Status::INVALID_METHOD);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut service = Service::connect(sample::provider(), ROOT_CIMV2).unwrap();
        service.close();
        service.close();
        assert!(service.is_closed());
        assert!(matches!(
            service.exec_query("SELECT * FROM Win32_Process"),
            Err(WmiError::HandleInvalid)
        ));
        assert!(matches!(
            service.get_object("Win32_Process"),
            Err(WmiError::HandleInvalid)
        ));
    }

    #[test]
    fn test_handles_released_on_drop() {
        let repo = Repository::new();
        let provider = Rc::new(MemoryProvider::new(repo));
        {
            let dyn_provider: Rc<dyn Provider> = provider.clone();
            let service = Service::connect(dyn_provider, ROOT).unwrap();
            let rows: Vec<_> = service
                .exec_query("SELECT * FROM __NAMESPACE")
                .unwrap()
                .collect();
            drop(rows);
            assert!(provider.open_handles() > 0);
        }
        assert_eq!(provider.open_handles(), 0);
    }
}
