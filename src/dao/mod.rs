mod postgre;

pub use postgre::{
    schema_path, to_signed, DataBase, PoolOption, PoolType, QueryResult,
    SCHEMA_FILES,
};
