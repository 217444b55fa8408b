/// Return this error from a VU behaviour to indicate that the virtual user is bailing.
///
/// Use it when a VU hits a problem that makes further iterations pointless for that VU, but not
/// for the run as a whole. The runner stops the VU, runs its teardown and lets the other VUs
/// carry on until the run ends.
#[derive(derive_more::Error, derive_more::Display, Debug)]
pub struct VuBailError {
    msg: String,
}

impl VuBailError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { msg: msg.into() }
    }
}

impl Default for VuBailError {
    fn default() -> Self {
        Self {
            msg: "Virtual user is bailing".to_string(),
        }
    }
}
