mod integration {
    mod aggregate {
        extern crate meterd;
        extern crate serde_json;
        extern crate url;

        use self::meterd::inspector::{Aggregate, Cache, Coercion, Inspector, InspectorError,
                                      MeterParam, Metadata, Oid, PreparedParam, RawReading};
        use self::serde_json::Value;
        use self::url::Url;

        /// A two-port switch with one disk. Byte counters live under `.10`
        /// (in) and `.16` (out). Readings are cached per OID like a real
        /// poller would.
        struct Switch;

        impl Inspector for Switch {
            fn prepare_params(
                &self,
                param: &MeterParam,
            ) -> Result<PreparedParam, InspectorError> {
                let coercion: Coercion = param.type_name.parse()?;
                Ok(PreparedParam::new(Oid::new(param.oid.as_str(), coercion)))
            }

            fn inspect_generic(
                &self,
                _host: &Url,
                cache: &mut Cache,
                _extra_metadata: &Metadata,
                param: &PreparedParam,
            ) -> Result<Vec<RawReading>, InspectorError> {
                let oid = &param.metric_oid;
                if let Some(hit) = cache.get(&oid.oid) {
                    return Ok(hit.clone());
                }
                let table: &[(&str, f64)] = match oid.oid.as_str() {
                    ".10" => &[("eth0", 1000.4), ("eth1", 24.0), ("lo", 1.0e6)],
                    ".16" => &[("eth0", 500.0), ("eth1", 76.9), ("lo", 1.0e6)],
                    _ => return Err(InspectorError::Query(format!("no such oid {}", oid.oid))),
                };
                let readings: Vec<RawReading> = table
                    .iter()
                    .map(|&(name, value)| {
                        let mut md = Metadata::new();
                        md.insert("name".to_string(), Value::String(name.to_string()));
                        RawReading::new(oid.coercion.apply(value), md, Metadata::new())
                    })
                    .collect();
                cache.insert(oid.oid.as_str(), readings.clone());
                Ok(readings)
            }
        }

        #[test]
        fn test_network_bits_in_and_out() {
            let agg = Aggregate::new(Switch);
            let param = MeterParam::new(".10", "int")
                .oid_extra(".16")
                .identifier("network");
            let prepared = agg.prepare_params(&param).unwrap();
            let host = Url::parse("snmp://switch-1").unwrap();
            let mut cache = Cache::new();

            let out = agg.inspect_generic(&host, &mut cache, &Metadata::new(), &prepared)
                .unwrap();

            assert_eq!(1, out.len());
            // int coercion truncates each reading before the sum
            assert_eq!((1000.0 + 24.0 + 500.0 + 76.0) * 8.0, out[0].value);
            assert!(out[0].metadata.is_empty());
            assert_eq!(
                Some(&Value::String("cluster".to_string())),
                out[0].extra_metadata.get("resource_id")
            );
            assert!(cache.get(".10").is_some());
            assert!(cache.get(".16").is_some());
        }

        #[test]
        fn test_bad_extra_oid_fails_whole_call() {
            let agg = Aggregate::new(Switch);
            let prepared = agg.prepare_params(&MeterParam::new(".10", "float").oid_extra(".99"))
                .unwrap();
            let host = Url::parse("snmp://switch-1").unwrap();
            match agg.inspect_generic(&host, &mut Cache::new(), &Metadata::new(), &prepared) {
                Err(InspectorError::Query(msg)) => assert!(msg.contains(".99")),
                other => panic!("unexpected {:?}", other),
            }
        }
    }
}
