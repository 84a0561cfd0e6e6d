use calimero_enclave_keys::{KeyName, KeyPolicy, KeyRequest, KEY_ID_SIZE, KEY_SIZE};
use calimero_enclave_primitives::buffer::{BufferView, BufferViewMut};
use clap::{Parser, ValueEnum};
use eyre::{Result as EyreResult, WrapErr};

use crate::cli::{BindingArg, RootArgs};

/// Derive a key of the running enclave and print it in hex
#[derive(Debug, Parser)]
pub struct KeyCommand {
    /// Which key to derive
    #[arg(long, value_enum, default_value_t = KeyNameArg::Seal)]
    pub name: KeyNameArg,

    /// Part of the enclave identity the key is bound to
    #[arg(long, value_enum, default_value_t = BindingArg::Signer)]
    pub binding: BindingArg,

    /// Hex encoded 32-byte key id, zero if omitted
    #[arg(long, value_name = "HEX")]
    pub key_id: Option<String>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum KeyNameArg {
    Seal,
    Report,
}

impl From<KeyNameArg> for KeyName {
    fn from(name: KeyNameArg) -> Self {
        match name {
            KeyNameArg::Seal => Self::Seal,
            KeyNameArg::Report => Self::Report,
        }
    }
}

impl KeyCommand {
    pub fn run(self, root_args: &RootArgs) -> EyreResult<()> {
        let native = root_args.native()?;

        let mut key_id = [0; KEY_ID_SIZE];

        if let Some(encoded) = &self.key_id {
            hex::decode_to_slice(encoded, &mut key_id)
                .wrap_err("key id must be 32 hex encoded bytes")?;
        }

        let identity = native.platform().keys().identity();

        let request = KeyRequest::new(
            self.name.into(),
            KeyPolicy::new(self.binding.into(), key_id),
            identity.isv_svn,
            identity.cpu_svn,
        );

        let mut key = [0; KEY_SIZE];

        let _written = native.get_key(
            BufferView::whole(&request.to_bytes()),
            BufferViewMut::whole(&mut key),
        )?;

        println!("{}", hex::encode(key));

        Ok(())
    }
}
