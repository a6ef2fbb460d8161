use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use db2_middleware::marshal::temporal;
use db2_middleware::native::{NativeTime, NativeTimestamp};
use db2_middleware::prelude::*;
use db2_middleware::test_utils::{MockResult, mock_connection, options};
use rust_decimal::Decimal;

fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32, ms: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|date| date.and_hms_milli_opt(h, min, s, ms))
        .expect("valid timestamp")
}

#[tokio::test]
async fn host_values_reach_their_native_setters() -> Result<(), Db2Error> {
    let (mut conn, driver) = mock_connection(options(Transport::Odbc));
    let before_epoch = at(1933, 4, 5, 6, 7, 8, 9);
    let mut cmd = conn.create_command();
    cmd.set_command_text("INSERT INTO T VALUES (:D, :TS, :TM, :B, :C, :F)");
    let params = cmd.parameters_mut();
    params.add_with_value(":D", Decimal::new(-12345, 3))?;
    params.add_with_value(":TS", before_epoch)?;
    params.add_with_value(":TM", NaiveTime::from_hms_milli_opt(13, 14, 15, 999).expect("valid time"))?;
    params.add(Parameter::new(":B", vec![1_u8, 2, 3]).with_db_type(DbType::Blob))?;
    params.add(Parameter::new(":C", "long text").with_db_type(DbType::Clob))?;
    params.add_with_value(":F", 0.5_f64)?;
    cmd.execute_non_query().await?;
    let sql = cmd.command_text().to_string();
    drop(cmd);

    let binds: Vec<NativeParam> = driver.state().binds_for(&sql).into_iter().map(|(_, p)| p).collect();
    let expected_decimal = BigDecimal::from_str("-12.345").map_err(|e| Db2Error::ConversionError(e.to_string()))?;
    assert_eq!(binds[0], NativeParam::BigDecimal(expected_decimal));
    assert_eq!(
        binds[1],
        NativeParam::Timestamp(NativeTimestamp {
            seconds: before_epoch.and_utc().timestamp(),
            nanos: 9_000_000,
        })
    );
    assert_eq!(binds[2], NativeParam::Time(NativeTime { hour: 13, minute: 14, second: 15 }));
    assert_eq!(binds[3], NativeParam::BinaryStream(vec![1, 2, 3]));
    assert_eq!(binds[4], NativeParam::CharacterStream("long text".into()));
    assert_eq!(binds[5], NativeParam::Double(0.5));
    Ok(())
}

#[tokio::test]
async fn timestamps_survive_a_trip_through_the_driver() -> Result<(), Db2Error> {
    let samples = [
        at(1933, 4, 5, 6, 7, 8, 9),
        at(1969, 12, 31, 23, 59, 59, 999),
        at(2016, 2, 29, 12, 0, 0, 1),
    ];
    let (mut conn, driver) = mock_connection(options(Transport::Jdbc));
    let mut result = MockResult::new(&[("TS", "TIMESTAMP")]);
    for ts in samples {
        result = result.row(vec![NativeValue::Timestamp(temporal::to_native_timestamp(ts)?)]);
    }
    driver.queue_query(vec![result]);

    let mut cmd = conn.create_command();
    cmd.set_command_text("SELECT TS FROM T");
    let mut reader = cmd.execute_reader().await?;
    let mut read_back = Vec::new();
    while reader.read().await? {
        read_back.push(reader.get_date_time(0).await?);
    }
    reader.close().await;
    assert_eq!(read_back, samples.to_vec());
    Ok(())
}

#[tokio::test]
async fn timestamps_beyond_year_9999_are_rejected_before_binding() -> Result<(), Db2Error> {
    let (mut conn, driver) = mock_connection(options(Transport::Odbc));
    for year in [40_000, -40_000] {
        let far = NaiveDate::from_ymd_opt(year, 6, 1)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .expect("valid timestamp");
        let mut cmd = conn.create_command();
        cmd.set_command_text("INSERT INTO T VALUES (:TS)");
        cmd.parameters_mut().add_with_value(":TS", far)?;
        let err = cmd.execute_non_query().await.unwrap_err();
        assert!(matches!(err, Db2Error::ConversionError(_)), "year {year}: {err:?}");
    }
    let state = driver.state();
    assert!(state.binds.is_empty());
    assert_eq!(state.statements_closed, state.prepared.len());
    Ok(())
}

#[tokio::test]
async fn native_timestamp_overflow_is_a_conversion_error() -> Result<(), Db2Error> {
    let (mut conn, driver) = mock_connection(options(Transport::Jdbc));
    driver.queue_query(vec![
        MockResult::new(&[("TS", "TIMESTAMP")])
            .row(vec![NativeValue::Timestamp(NativeTimestamp { seconds: i64::MAX, nanos: 0 })]),
    ]);
    let mut cmd = conn.create_command();
    cmd.set_command_text("SELECT TS FROM T");
    let mut reader = cmd.execute_reader().await?;
    assert!(reader.read().await?);
    let err = reader.get_date_time(0).await.unwrap_err();
    reader.close().await;
    assert!(matches!(err, Db2Error::ConversionError(_)), "{err:?}");
    Ok(())
}

#[tokio::test]
async fn decimals_read_from_plain_and_scientific_text() -> Result<(), Db2Error> {
    let (mut conn, driver) = mock_connection(options(Transport::Odbc));
    driver.queue_query(vec![
        MockResult::new(&[("D", "DECFLOAT")])
            .row(vec![NativeValue::String("1.25E2".into())])
            .row(vec![NativeValue::String("-0.001".into())])
            .row(vec![NativeValue::Null]),
    ]);
    let mut cmd = conn.create_command();
    cmd.set_command_text("SELECT D FROM T");
    let rows = cmd.query().await?;
    let values: Vec<Option<Decimal>> = rows
        .results
        .iter()
        .map(|row| row.get_by_index(0).and_then(Value::as_decimal))
        .collect();
    assert_eq!(values, vec![Some(Decimal::new(125, 0)), Some(Decimal::new(-1, 3)), None]);
    Ok(())
}
