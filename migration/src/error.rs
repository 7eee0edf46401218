// Copyright (c) 2024 Huawei Technologies Co.,Ltd. All rights reserved.
//
// StratoVirt is licensed under Mulan PSL v2.
// You can use this software according to the terms and conditions of the Mulan
// PSL v2.
// You may obtain a copy of Mulan PSL v2 at:
//         http://license.coscl.org.cn/MulanPSL2
// THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY
// KIND, EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO
// NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
// See the Mulan PSL v2 for more details.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("Io")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("Json")]
    Json {
        #[from]
        source: serde_json::Error,
    },
    #[error("Migration compat_version {0} higher than current version {1}")]
    VersionNotFit(u32, u32),
    #[error("Unsupported state version {1} for device {0}")]
    UnsupportedVersion(String, u32),
    #[error("{0} for snapshot file / migration stream is not fit")]
    HeaderItemNotFit(String),
    #[error("Can't restore structure from raw slice: {0}")]
    FromBytesError(&'static str),
    #[error("Invalid value {1} for field {0} in device state")]
    InvalidField(&'static str, u64),
}
