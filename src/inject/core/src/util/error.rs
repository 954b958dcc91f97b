//! Error reporting helpers built off the standard library [Error] trait.

use std::{error::Error, fmt};

use derive_where::derive_where;

pub trait ErrorFormatExt: Error {
	fn format_error(&self) -> FormattedError<Self> {
		FormattedError(self)
	}

	fn log(&self) {
		log::error!("{}", self.format_error());
	}

	fn log_warn(&self) {
		log::warn!("{}", self.format_error());
	}
}

impl<T: ?Sized + Error> ErrorFormatExt for T {}

/// Displays an error followed by its indented cause chain.
#[derive_where(Copy, Clone)]
pub struct FormattedError<'a, T: ?Sized>(pub &'a T);

impl<T: ?Sized + Error> fmt::Display for FormattedError<'_, T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let target = self.0;
		write!(f, "{}", target)?;

		let mut cause_iter = target.source();
		if cause_iter.is_some() {
			write!(f, "\n\nCaused by:")?;
		}

		while let Some(cause) = cause_iter {
			for line in cause.to_string().lines() {
				write!(f, "\n\t{}", line)?;
			}
			cause_iter = cause.source();
		}

		Ok(())
	}
}

pub trait ResultExt {
	type Success;

	/// Logs the error, if any, and discards it.
	fn log(self) -> Option<Self::Success>;
}

impl<T, E: Error> ResultExt for Result<T, E> {
	type Success = T;

	fn log(self) -> Option<T> {
		match self {
			Ok(val) => Some(val),
			Err(err) => {
				err.log();
				None
			}
		}
	}
}
