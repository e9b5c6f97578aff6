#![allow(clippy::missing_safety_doc)] // Well, using C-pointers *is* unsafe...

extern crate static_vcruntime;

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::ptr::{null, null_mut};

use matryoshka_sqlite::errors::Error;
use matryoshka_sqlite::{Database, FileHandle as RawFileHandle, FileSystem as RawFileSystem};

struct Environment(*mut *mut Status);

impl From<*mut *mut Status> for Environment {
    fn from(value: *mut *mut Status) -> Self {
        Self(value)
    }
}

impl Environment {
    pub fn execute<T, C: FnOnce() -> Result<T, String>>(self, body: C) -> *mut T {
        match body() {
            Ok(value) => Box::into_raw(Box::new(value)),
            Err(error) => {
                if !self.0.is_null() {
                    let status = Environment::create_status(&error);
                    unsafe {
                        std::ptr::write(self.0, status);
                    }
                }
                null_mut()
            }
        }
    }

    pub fn create_status<T: AsRef<str>>(description: T) -> *mut Status {
        let message = CString::new(description.as_ref()).expect("Found NULL");
        Box::into_raw(Box::new(Status(message)))
    }

    pub fn parse_str<'a>(c_string: *const c_char) -> Result<&'a str, String> {
        (!c_string.is_null())
            .then(|| unsafe { CStr::from_ptr(c_string) })
            .ok_or_else(|| String::from("Path not specified"))
            .and_then(|raw_str| {
                raw_str
                    .to_str()
                    .map_err(|_| String::from("Path contains invalid UTF8"))
            })
    }

    pub fn destroy<T>(pointer: *mut T) {
        if pointer.is_null() {
            return;
        }
        unsafe {
            Box::from_raw(pointer);
        }
    }
}

/// The virtual file system.
pub struct FileSystem(RawFileSystem<Database>);

/// The status of the operation.
pub struct Status(CString);

/// The handle to a file.
pub struct FileHandle(RawFileHandle);

/// Open a SQLite database containing the Matryoshka virtual file system.
///
/// @param path The path to the Matryoshka SQlite database.
///
/// @param status Contains the error code of the failure if and only if the return value is nullptr. Setting this value to nullptr is safe and will not save the error code.
///
/// @return A pointer to the virtual file system or nullptr on failure.
#[no_mangle]
pub unsafe extern "C" fn Load(path: *const c_char, status: *mut *mut Status) -> *mut FileSystem {
    Environment::from(status).execute(|| {
        let path = Environment::parse_str(path)?;

        let database = Database::open(path).map_err(|error| format!("Unable to open database: {}", error))?;

        Ok(FileSystem(
            RawFileSystem::load(database, true).map_err(|error| error.error_message())?,
        ))
    })
}

/// Destroy a file system.
///
/// @param file_system The virtual file system. Passing nullptr is a safe no-op.
#[no_mangle]
pub unsafe extern "C" fn DestroyFileSystem(file_system: *mut FileSystem) {
    Environment::destroy(file_system)
}

/// Destroy a status.
///
/// @param status The status. Passing nullptr is a safe no-op.
#[no_mangle]
pub unsafe extern "C" fn DestroyStatus(status: *mut Status) {
    Environment::destroy(status)
}

/// Destroy a file handle.
///
/// @param file_handle The file handle. Passing nullptr is a safe no-op.
#[no_mangle]
pub unsafe extern "C" fn DestroyFileHandle(file_handle: *mut FileHandle) {
    Environment::destroy(file_handle)
}

/// Return the error message associated with a status.
///
/// @param status The status of interest.
///
/// @return A human-readable description of the failure.
#[no_mangle]
pub unsafe extern "C" fn GetMessage(status: *const Status) -> *const c_char {
    match status.as_ref() {
        Some(value) => value.0.as_ptr(),
        None => null(),
    }
}

/// Open an existing file on the virtual file system.
///
/// @param file_system A pointer to the virtual file system.
///
/// @param path The (inner) path on the virtual file system (mind the forward slashes as separators!)
///
/// @param status Contains the error code of the failure if and only if the return value is nullptr. Setting this value to nullptr is safe and will not save the error code.
///
/// @return A handle to the file or nullptr at failure.
#[no_mangle]
pub unsafe extern "C" fn Open(
    file_system: *mut FileSystem,
    path: *const c_char,
    status: *mut *mut Status,
) -> *mut FileHandle {
    Environment::from(status).execute(|| {
        let file_system = file_system
            .as_ref()
            .ok_or_else(|| String::from("File system not specified"))?;
        let inner_path = Environment::parse_str(path)?;
        let handle = file_system.0.open(inner_path).map_err(|error| error.error_message())?;
        Ok(FileHandle(handle))
    })
}

/// Push a file to the virtual file system.
///
/// @param file_system A pointer to the virtual file system.
///
/// @param inner_path The inner path on the virtual file system (mind the forward slashes as separators!)
///
/// @param file_path The path on the real file system.
///
/// @param chunk_size The proposed chunk size. Negative values will let the virtual file system choose.
///
/// @param status Contains the error code of the failure if and only if the return value is nullptr. Setting this value to nullptr is safe and will not save the error code.
///
/// @return A handle to the newly created file or nullptr on failure.
#[no_mangle]
pub unsafe extern "C" fn Push(
    file_system: *mut FileSystem,
    inner_path: *const c_char,
    file_path: *const c_char,
    chunk_size: c_int,
    status: *mut *mut Status,
) -> *mut FileHandle {
    Environment::from(status).execute(|| {
        let file_system = file_system
            .as_mut()
            .ok_or_else(|| String::from("File system not specified"))?;
        let inner_path = Environment::parse_str(inner_path)?;
        let file_path = Environment::parse_str(file_path)?;

        let handle = file_system
            .0
            .create_from_host_file(inner_path, file_path, chunk_size as i64)
            .map_err(|error| error.error_message())?;
        Ok(FileHandle(handle))
    })
}

/// Pull a file from the virtual file system onto the real file system.
///
/// @param file_system A pointer to the virtual file system.
///
/// @param handle A handle to the file.
///
/// @param file_path The path on the real file system.
///
/// @return An error occurring during the operation or nullptr on success.
#[no_mangle]
pub unsafe extern "C" fn Pull(
    file_system: *mut FileSystem,
    handle: *const FileHandle,
    file_path: *const c_char,
) -> *mut Status {
    let file_system = match file_system.as_ref() {
        Some(file_system) => file_system,
        None => {
            return Environment::create_status("File system not specified");
        }
    };

    let handle = match handle.as_ref() {
        Some(handle) => handle.0,
        None => {
            return Environment::create_status("File handle not specified");
        }
    };

    let local_path = match Environment::parse_str(file_path) {
        Ok(local_path) => local_path,
        Err(error) => {
            return Environment::create_status(error);
        }
    };

    let size = match file_system.0.size(handle) {
        Ok(Some(size)) => size,
        Ok(None) => return Environment::create_status("File not found"),
        Err(error) => return Environment::create_status(error.error_message()),
    };

    match file_system.0.read_to_host_file(handle, local_path, 0, size, false) {
        Ok(()) => null_mut(),
        Err(error) => Environment::create_status(error.error_message()),
    }
}

/// Returns the size of a file.
///
/// @param file_system A pointer to the virtual file system.
///
/// @param file_handle A handle to the file.
///
/// @return File size in bytes, or -1 if the file does not exist / on failure.
#[no_mangle]
pub unsafe extern "C" fn GetSize(file_system: *const FileSystem, file_handle: *const FileHandle) -> c_int {
    let file_system = match file_system.as_ref() {
        Some(file_system) => file_system,
        None => {
            return -1;
        }
    };

    let file_handle = match file_handle.as_ref() {
        Some(file_handle) => file_handle.0,
        None => {
            return -1;
        }
    };

    match file_system.0.size(file_handle) {
        Ok(Some(size)) => size as c_int,
        _ => -1,
    }
}

/// Delete a file. The file handle must not be used after the call but still needs to be freed.
///
/// @param file_system A pointer to the virtual file system.
///
/// @param file A handle to the file.
///
/// @return 1 if the operation was successful, 0 otherwise.
#[no_mangle]
pub unsafe extern "C" fn Delete(file_system: *mut FileSystem, file: *const FileHandle) -> c_int {
    let file_system = match file_system.as_mut() {
        Some(file_system) => file_system,
        None => {
            return 0;
        }
    };

    let file_handle = match file.as_ref() {
        Some(file_handle) => file_handle.0,
        None => {
            return 0;
        }
    };

    match file_system.0.delete(file_handle) {
        Ok(true) => 1,
        _ => 0,
    }
}

/// Search for matching file(s).
///
/// @param file_system A pointer to the virtual file system.
///
/// @param path The path supporting glob-like placeholders.
///
/// @param callback A callback invoked once for each path found.
///
/// @return The number of paths found, or -1 on failure.
#[no_mangle]
pub unsafe extern "C" fn Find(
    file_system: *mut FileSystem,
    path: *const c_char,
    callback: unsafe extern "C" fn(*const c_char),
) -> c_int {
    let file_system = match file_system.as_ref() {
        Some(file_system) => file_system,
        None => {
            return -1;
        }
    };
    let path = match Environment::parse_str(path) {
        Ok(path) => path,
        Err(_) => {
            return -1;
        }
    };

    let paths: Vec<CString> = match file_system.0.find(Some(path)) {
        Ok(paths) => paths
            .into_iter()
            .map(|path| CString::new(path.absolute(None)).expect("NULL found"))
            .collect(),
        Err(_) => {
            return -1;
        }
    };

    for path in paths.iter() {
        callback(path.as_ptr());
    }

    paths.len() as c_int
}
