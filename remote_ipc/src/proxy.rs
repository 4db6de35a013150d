//! Client side of a remote interface
//!
//! [`ProxyCore`] does the marshaling every generated-style proxy needs:
//! borrow two scratch parcels, write the interface token and arguments,
//! submit the transaction, then decode the exception header and the result.
//! Interface proxies hold one and add a typed method per transaction code.

use crate::{IpcConfig, RemoteError, RemoteHandle};
use core_types::{InterfaceDescriptor, TransactionCode, TransactionFlags};
use ipc::{Parcel, ParcelError, ParcelPool, Parcelable};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Implemented by every interface proxy
pub trait Proxy {
    /// Token identifying the interface; no transport interaction
    fn interface_descriptor(&self) -> InterfaceDescriptor;

    /// The handle calls are submitted through, not a copy of it
    fn as_handle(&self) -> &Arc<dyn RemoteHandle>;
}

/// Shared marshaling logic for interface proxies
#[derive(Debug, Clone)]
pub struct ProxyCore {
    handle: Arc<dyn RemoteHandle>,
    descriptor: InterfaceDescriptor,
    pool: Arc<ParcelPool>,
}

impl ProxyCore {
    /// Creates a proxy core with a pool built from the default config
    pub fn new(handle: Arc<dyn RemoteHandle>, descriptor: InterfaceDescriptor) -> Self {
        Self::with_pool(handle, descriptor, IpcConfig::default().parcel_pool())
    }

    /// Creates a proxy core drawing scratch parcels from `pool`
    pub fn with_pool(
        handle: Arc<dyn RemoteHandle>,
        descriptor: InterfaceDescriptor,
        pool: Arc<ParcelPool>,
    ) -> Self {
        Self {
            handle,
            descriptor,
            pool,
        }
    }

    pub fn interface_descriptor(&self) -> InterfaceDescriptor {
        self.descriptor
    }

    pub fn as_handle(&self) -> &Arc<dyn RemoteHandle> {
        &self.handle
    }

    pub fn pool(&self) -> &Arc<ParcelPool> {
        &self.pool
    }

    /// Calls a method whose result is a single [`Parcelable`]
    pub fn call<R, W>(&self, code: TransactionCode, write_args: W) -> Result<R, RemoteError>
    where
        R: Parcelable,
        W: FnOnce(&mut Parcel) -> Result<(), ParcelError>,
    {
        self.call_with(code, write_args, R::read_from_parcel)
    }

    /// Calls a method, decoding the result with `read_result`
    ///
    /// Both scratch parcels are pool guards and go back to the pool when
    /// this function returns, whichever way it returns.
    pub fn call_with<R, W, D>(
        &self,
        code: TransactionCode,
        write_args: W,
        read_result: D,
    ) -> Result<R, RemoteError>
    where
        W: FnOnce(&mut Parcel) -> Result<(), ParcelError>,
        D: FnOnce(&mut Parcel) -> Result<R, ParcelError>,
    {
        let mut data = self.pool.acquire();
        let mut reply = self.pool.acquire();

        data.write_interface_token(self.descriptor)?;
        write_args(&mut data)?;

        trace!(
            descriptor = %self.descriptor,
            %code,
            bytes = data.data_size(),
            "submitting transaction"
        );
        let bytes = self
            .handle
            .transact(code, data.as_bytes(), TransactionFlags::NONE)
            .inspect_err(|err| {
                warn!(descriptor = %self.descriptor, %code, error = %err, "transaction failed");
            })?;
        reply.set_data(&bytes)?;

        if let Some(status) = reply.read_exception()? {
            debug!(descriptor = %self.descriptor, %code, %status, "remote raised exception");
            return Err(RemoteError::Application(status));
        }
        let result = read_result(&mut reply)?;
        reply.finish()?;
        Ok(result)
    }

    /// Submits a oneway transaction; no reply is awaited or decoded
    pub fn call_oneway<W>(&self, code: TransactionCode, write_args: W) -> Result<(), RemoteError>
    where
        W: FnOnce(&mut Parcel) -> Result<(), ParcelError>,
    {
        let mut data = self.pool.acquire();
        data.write_interface_token(self.descriptor)?;
        write_args(&mut data)?;

        trace!(descriptor = %self.descriptor, %code, "submitting oneway transaction");
        self.handle
            .transact(code, data.as_bytes(), TransactionFlags::ONEWAY)?;
        Ok(())
    }
}

impl Proxy for ProxyCore {
    fn interface_descriptor(&self) -> InterfaceDescriptor {
        self.descriptor
    }

    fn as_handle(&self) -> &Arc<dyn RemoteHandle> {
        &self.handle
    }
}
