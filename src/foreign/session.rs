//! Typestate wrapper around a preprocessing service handle.
//!
//! `Session<Opened>` can only be parsed; parsing yields the forms and a
//! `Session<Parsed>`, the only state that hands out the macro table. The
//! handle is released when the session is dropped, whichever state it is in.

use log::trace;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use super::forms::Form;
use super::preprocess::Preprocessor;
use super::table::MacroTable;
use crate::errors::HdrError;

pub struct Opened;
pub struct Parsed;

pub struct Session<'p, P: Preprocessor, S> {
    service: &'p P,
    handle: Option<P::Handle>,
    path: PathBuf,
    _state: PhantomData<S>,
}

impl<'p, P: Preprocessor> Session<'p, P, Opened> {
    pub fn open(service: &'p P, path: &Path) -> Result<Self, HdrError> {
        let handle = service.open(path)?;
        trace!("session opened for {}", path.display());
        Ok(Session {
            service,
            handle: Some(handle),
            path: path.to_path_buf(),
            _state: PhantomData,
        })
    }

    pub fn parse(mut self) -> Result<(Vec<Form>, Session<'p, P, Parsed>), HdrError> {
        let Some(mut handle) = self.handle.take() else {
            return Ok((Vec::new(), self.into_state()));
        };
        // on failure `handle` must still be closed
        match self.service.parse_forms(&mut handle) {
            Ok(forms) => {
                let mut parsed = self.into_state();
                parsed.handle = Some(handle);
                Ok((forms, parsed))
            }
            Err(err) => {
                self.service.close(handle);
                Err(err)
            }
        }
    }
}

impl<P: Preprocessor> Session<'_, P, Parsed> {
    pub fn macro_table(&mut self) -> Result<MacroTable, HdrError> {
        match self.handle.as_mut() {
            Some(handle) => self.service.macro_table(handle),
            None => Ok(MacroTable::new()),
        }
    }
}

impl<'p, P: Preprocessor, S> Session<'p, P, S> {
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn into_state<T>(mut self) -> Session<'p, P, T> {
        Session {
            service: self.service,
            handle: self.handle.take(),
            path: std::mem::take(&mut self.path),
            _state: PhantomData,
        }
    }
}

impl<P: Preprocessor, S> Drop for Session<'_, P, S> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            trace!("session closed for {}", self.path.display());
            self.service.close(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{ErrorKind, HdrError};
    use crate::foreign::table::{Arity, MacroDef};
    use std::cell::Cell;

    /// Service that counts open and close calls.
    #[derive(Default)]
    struct Counting {
        opened: Cell<usize>,
        closed: Cell<usize>,
        fail_parse: bool,
    }

    impl Preprocessor for Counting {
        type Handle = usize;

        fn open(&self, _path: &Path) -> Result<usize, HdrError> {
            self.opened.set(self.opened.get() + 1);
            Ok(self.opened.get())
        }

        fn parse_forms(&self, _handle: &mut usize) -> Result<Vec<Form>, HdrError> {
            if self.fail_parse {
                return Err(HdrError::bare(
                    ErrorKind::MalformedConstruct {
                        construct: "header".into(),
                    },
                    "preprocess",
                ));
            }
            Ok(vec![Form::TypeDecl {
                name: "t".into(),
                line: 1,
            }])
        }

        fn macro_table(&self, _handle: &mut usize) -> Result<MacroTable, HdrError> {
            let mut table = MacroTable::new();
            table.define(
                "M",
                Arity::None,
                MacroDef {
                    params: vec![],
                    body: vec![],
                    line: 1,
                },
            );
            Ok(table)
        }

        fn close(&self, _handle: usize) {
            self.closed.set(self.closed.get() + 1);
        }
    }

    #[test]
    fn test_close_after_successful_protocol() {
        let service = Counting::default();
        {
            let session = Session::open(&service, Path::new("a.hrl")).unwrap();
            let (forms, mut parsed) = session.parse().unwrap();
            assert_eq!(forms.len(), 1);
            assert_eq!(parsed.macro_table().unwrap().len(), 1);
            assert_eq!(service.closed.get(), 0);
        }
        assert_eq!(service.opened.get(), 1);
        assert_eq!(service.closed.get(), 1);
    }

    #[test]
    fn test_close_on_parse_failure() {
        let service = Counting {
            fail_parse: true,
            ..Counting::default()
        };
        let session = Session::open(&service, Path::new("a.hrl")).unwrap();
        assert!(session.parse().is_err());
        assert_eq!(service.closed.get(), 1);
    }

    #[test]
    fn test_close_when_dropped_unparsed() {
        let service = Counting::default();
        drop(Session::open(&service, Path::new("a.hrl")).unwrap());
        assert_eq!(service.closed.get(), 1);
    }
}
