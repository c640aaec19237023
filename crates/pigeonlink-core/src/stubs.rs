// Stand-ins for device glue that only exists on Linux.

pub mod joystick {
    use std::io;
    use std::path::{Path, PathBuf};

    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct AxisState {
        pub x: i16,
        pub y: i16,
    }

    /// Never opens: joydev is Linux-only.
    pub struct Joystick {
        path: PathBuf,
    }

    impl Joystick {
        pub fn open(_path: &Path) -> io::Result<Self> {
            Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "joystick input requires Linux joydev",
            ))
        }

        pub fn path(&self) -> &Path {
            &self.path
        }

        pub fn poll(&mut self) -> io::Result<AxisState> {
            Ok(AxisState::default())
        }
    }
}
