use crate::backend::Backend;
use crate::settings::FormSettings;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// Collaborators shared by every node of one form tree.
///
/// A tree lives for one request on one thread; the backend handle is
/// reference-counted without synchronisation, the settings are immutable.
#[derive(Clone)]
pub struct FormContext {
	backend: Rc<dyn Backend>,
	settings: Arc<FormSettings>,
}

impl FormContext {
	pub fn new(backend: Rc<dyn Backend>, settings: impl Into<Arc<FormSettings>>) -> Self {
		Self {
			backend,
			settings: settings.into(),
		}
	}

	/// Context with default settings.
	pub fn with_backend(backend: Rc<dyn Backend>) -> Self {
		Self::new(backend, FormSettings::default())
	}

	pub fn backend(&self) -> &dyn Backend {
		self.backend.as_ref()
	}

	pub fn settings(&self) -> &FormSettings {
		&self.settings
	}
}

impl fmt::Debug for FormContext {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FormContext")
			.field("settings", &self.settings)
			.finish_non_exhaustive()
	}
}
