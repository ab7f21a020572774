pub mod index;
pub mod shape;
pub mod storage;
pub mod tensor_data;
