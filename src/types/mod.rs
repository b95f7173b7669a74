pub use self::common::{
    Asset, BodyError, Rate_Entry, Reserve_Rates_Type, RpcBody, RpcRequest,
    ETH_ID,
};

mod common;
