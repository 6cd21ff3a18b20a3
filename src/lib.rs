#![cfg_attr(docsrs, feature(doc_cfg))]
/*!
redis-sentinel-resp resolves a Redis master address through a Sentinel
deployment and encodes commands as RESP3 request frames.

# Philosophy
* Low allocations
* Lock-free resolver state
* Rust idiomatic API

# Features

| Feature | Description |
| ------- | ----------- |
| `json` | `serde_json`-backed [`codec::JsonCodec`] (default) |

# Basic usage

```no_run
use redis_sentinel_resp::addr::{SentinelAddr, SentinelAddrMap};
use redis_sentinel_resp::sentinel::{SentinelOptions, SentinelSpec, TcpConnectionProvider};
use std::sync::Arc;

let mut sentinels = SentinelAddrMap::new();
sentinels.insert(
    "mymaster".to_owned(),
    vec![SentinelAddr::new("127.0.0.1", 26379)],
);

let spec = SentinelSpec::new(sentinels, SentinelOptions::default(), Arc::new(TcpConnectionProvider));
let master_addr = spec.resolve_master_addr("mymaster", None, None)?;
println!("master is at {master_addr}");
# Ok::<(), redis_sentinel_resp::Error>(())
```

Encoding a request once a master connection is open:

```
use redis_sentinel_resp::resp::{write_requests, ToArg};

let mut buf = Vec::new();
write_requests(&mut buf, vec![vec!["SET".to_arg(), "key".to_arg(), "value".to_arg()]], true)?;
assert_eq!(buf, b"*3\r\n$3\r\nSET\r\n$3\r\nkey\r\n$5\r\nvalue\r\n");
# Ok::<(), redis_sentinel_resp::Error>(())
```
*/

pub mod addr;
pub mod codec;
pub mod error;
pub mod resp;
pub mod sentinel;

pub use error::{Error, Result};
