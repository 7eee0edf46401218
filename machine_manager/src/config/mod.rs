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

mod error;

pub use error::ConfigError;

use anyhow::{anyhow, bail, Result};
use log::debug;

/// Max length of a string argument on the command line.
pub const MAX_STRING_LENGTH: usize = 255;
/// Length of a mac address in `xx:xx:xx:xx:xx:xx` form.
pub const MAC_ADDRESS_LENGTH: usize = 17;

/// Convert a device argument string like `type,key1=value1,key2` into arguments clap can
/// parse: `--classtype type --key1 value1 --key2`.
///
/// # Arguments
///
/// * `args` - The device argument string.
/// * `first_pos_is_type` - The first item without `=` names the device type.
/// * `first_pos_is_subcommand` - The first item is passed through untouched as a subcommand.
pub fn str_slip_to_clap(
    args: &str,
    first_pos_is_type: bool,
    first_pos_is_subcommand: bool,
) -> Vec<String> {
    let mut itr: Vec<String> = Vec::new();
    for (index, param) in args.split(',').enumerate() {
        if param.is_empty() {
            continue;
        }
        match param.split_once('=') {
            Some((key, value)) => {
                itr.push(format!("--{}", key));
                itr.push(value.to_string());
            }
            None if index == 0 && first_pos_is_subcommand => itr.push(param.to_string()),
            None if index == 0 && first_pos_is_type => {
                itr.push("--classtype".to_string());
                itr.push(param.to_string());
            }
            None => itr.push(format!("--{}", param)),
        }
    }
    debug!("Device arguments {} split to {:?}", args, itr);
    itr
}

/// Check that an argument is not longer than [`MAX_STRING_LENGTH`].
pub fn check_arg_too_long(arg: &str, name: &str) -> Result<()> {
    if arg.len() > MAX_STRING_LENGTH {
        bail!(ConfigError::StringLengthTooLong(
            name.to_string(),
            MAX_STRING_LENGTH
        ));
    }
    Ok(())
}

/// Validate a device or backend id. Used as a clap `value_parser`.
pub fn valid_id(id: &str) -> Result<String> {
    check_arg_too_long(id, "id")?;
    if id.is_empty()
        || !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        bail!(ConfigError::InvalidParam(id.to_string(), "id".to_string()));
    }
    Ok(id.to_string())
}

/// Check a mac address written as six colon separated hex pairs.
pub fn check_mac_address(mac: &str) -> bool {
    if mac.len() != MAC_ADDRESS_LENGTH {
        return false;
    }

    let mac_vec: Vec<&str> = mac.split(':').collect();
    mac_vec.len() == 6
        && mac_vec
            .iter()
            .all(|bits| bits.len() == 2 && bits.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Parse a mac address string into its six bytes. Used as a clap `value_parser`.
pub fn valid_mac(mac: &str) -> Result<[u8; 6]> {
    if !check_mac_address(mac) {
        bail!(ConfigError::MacFormatError);
    }
    let mut bytes = [0_u8; 6];
    for (byte, bits) in bytes.iter_mut().zip(mac.split(':')) {
        *byte = u8::from_str_radix(bits, 16).map_err(|_| ConfigError::MacFormatError)?;
    }
    Ok(bytes)
}

/// Parse a decimal or `0x` prefixed hexadecimal number.
pub fn str_to_num(s: &str) -> Result<u64> {
    let (digits, radix) = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => (hex, 16),
        None => (s, 10),
    };
    u64::from_str_radix(digits, radix)
        .map_err(|_| anyhow!(ConfigError::ConvertValueFailed(s.to_string(), "u64".to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_str_slip_to_clap() {
        assert_eq!(
            str_slip_to_clap("s5pc1xx-usb-otg,id=otg0,netdev=net0", true, false),
            vec![
                "--classtype",
                "s5pc1xx-usb-otg",
                "--id",
                "otg0",
                "--netdev",
                "net0"
            ]
        );
        assert_eq!(
            str_slip_to_clap("tap,id=net0", false, true),
            vec!["tap", "--id", "net0"]
        );
        assert_eq!(str_slip_to_clap("id=a,,on", false, false), vec!["--id", "a", "--on"]);
    }

    #[test]
    fn test_valid_id() {
        assert_eq!(valid_id("otg0").unwrap(), "otg0");
        assert!(valid_id("usb-otg_1.0").is_ok());
        assert!(valid_id("").is_err());
        assert!(valid_id("a b").is_err());
        assert!(valid_id(&"x".repeat(MAX_STRING_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_mac_address() {
        assert!(check_mac_address("52:54:00:12:34:56"));
        assert!(check_mac_address("aA:bB:cC:dD:eE:fF"));
        assert!(!check_mac_address("52:54:00:12:34"));
        assert!(!check_mac_address("52-54-00-12-34-56"));
        assert!(!check_mac_address("52:54:00:12:34:5g"));

        assert_eq!(
            valid_mac("52:54:00:12:34:56").unwrap(),
            [0x52, 0x54, 0x00, 0x12, 0x34, 0x56]
        );
        assert!(valid_mac("52:54:00:12:34").is_err());
    }

    #[test]
    fn test_str_to_num() {
        assert_eq!(str_to_num("0x7c300000").unwrap(), 0x7c30_0000);
        assert_eq!(str_to_num("4096").unwrap(), 4096);
        assert!(str_to_num("0xzz").is_err());
        assert!(str_to_num("").is_err());
    }
}
