pub mod relbatch {
    pub mod v1 {
        tonic::include_proto!("relbatch.v1");
    }
}
