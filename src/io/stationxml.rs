//! FDSN StationXML 1.1 reading and writing.
//!
//! The XML is mapped onto plain serde structs mirroring the schema (attributes as `@name`,
//! element text as `$text`), which are then converted to and from the `Inventory` tree.

use crate::error::{ExplorerError, ExplorerResult};
use crate::inventory::{Channel, Epoch, Inventory, Network, Station};
use crate::response::{
    Decimation, FirSymmetry, InstrumentSensitivity, PzTransferFunction, Response, ResponseStage,
    StageKind,
};
use crate::timestamp::parse_datetime;
use chrono::{DateTime, SecondsFormat, Utc};
use log::{debug, warn};
use num_complex::Complex64;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

const NAMESPACE: &str = "http://www.fdsn.org/xml/station/1";
const SCHEMA_VERSION: &str = "1.1";

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(rename = "FDSNStationXML", rename_all = "PascalCase")]
struct StationXml {
    #[serde(rename = "@xmlns", default, skip_serializing_if = "Option::is_none")]
    xmlns: Option<String>,
    #[serde(rename = "@schemaVersion", default, skip_serializing_if = "Option::is_none")]
    schema_version: Option<String>,
    #[serde(default)]
    source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    module: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created: Option<String>,
    #[serde(default)]
    network: Vec<NetworkXml>,
}

/// Number with optional unit and error attributes, which are ignored.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy)]
struct FloatXml {
    #[serde(rename = "$text")]
    value: f64,
}

impl From<f64> for FloatXml {
    fn from(value: f64) -> Self {
        FloatXml { value }
    }
}

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "PascalCase")]
struct NetworkXml {
    #[serde(rename = "@code")]
    code: String,
    #[serde(rename = "@startDate", default, skip_serializing_if = "Option::is_none")]
    start_date: Option<String>,
    #[serde(rename = "@endDate", default, skip_serializing_if = "Option::is_none")]
    end_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default)]
    station: Vec<StationXmlElement>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "PascalCase")]
struct StationXmlElement {
    #[serde(rename = "@code")]
    code: String,
    #[serde(rename = "@startDate", default, skip_serializing_if = "Option::is_none")]
    start_date: Option<String>,
    #[serde(rename = "@endDate", default, skip_serializing_if = "Option::is_none")]
    end_date: Option<String>,
    latitude: FloatXml,
    longitude: FloatXml,
    elevation: FloatXml,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    site: Option<SiteXml>,
    #[serde(default)]
    channel: Vec<ChannelXml>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "PascalCase")]
struct SiteXml {
    #[serde(default)]
    name: String,
}

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "PascalCase")]
struct ChannelXml {
    #[serde(rename = "@code")]
    code: String,
    #[serde(rename = "@locationCode", default)]
    location_code: String,
    #[serde(rename = "@startDate", default, skip_serializing_if = "Option::is_none")]
    start_date: Option<String>,
    #[serde(rename = "@endDate", default, skip_serializing_if = "Option::is_none")]
    end_date: Option<String>,
    latitude: FloatXml,
    longitude: FloatXml,
    elevation: FloatXml,
    depth: FloatXml,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    azimuth: Option<FloatXml>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dip: Option<FloatXml>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sample_rate: Option<FloatXml>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sensor: Option<SensorXml>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    response: Option<ResponseXml>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "PascalCase")]
struct SensorXml {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "PascalCase")]
struct ResponseXml {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    instrument_sensitivity: Option<SensitivityXml>,
    #[serde(default)]
    stage: Vec<StageXml>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "PascalCase")]
struct UnitsXml {
    name: String,
}

impl UnitsXml {
    fn new(name: &str) -> Self {
        UnitsXml {
            name: name.to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "PascalCase")]
struct SensitivityXml {
    value: f64,
    frequency: f64,
    input_units: UnitsXml,
    output_units: UnitsXml,
}

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "PascalCase")]
struct StageXml {
    #[serde(rename = "@number")]
    number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    poles_zeros: Option<PolesZerosXml>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    coefficients: Option<CoefficientsXml>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    response_list: Option<ResponseListXml>,
    #[serde(rename = "FIR", default, skip_serializing_if = "Option::is_none")]
    fir: Option<FirXml>,
    #[serde(default, skip_serializing)]
    polynomial: Option<IgnoredAny>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    decimation: Option<DecimationXml>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    stage_gain: Option<GainXml>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "PascalCase")]
struct PolesZerosXml {
    input_units: UnitsXml,
    output_units: UnitsXml,
    pz_transfer_function_type: String,
    normalization_factor: f64,
    normalization_frequency: FloatXml,
    #[serde(default)]
    zero: Vec<PoleZeroXml>,
    #[serde(default)]
    pole: Vec<PoleZeroXml>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "PascalCase")]
struct PoleZeroXml {
    #[serde(rename = "@number", default)]
    number: u32,
    real: FloatXml,
    imaginary: FloatXml,
}

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "PascalCase")]
struct CoefficientsXml {
    input_units: UnitsXml,
    output_units: UnitsXml,
    cf_transfer_function_type: String,
    #[serde(default)]
    numerator: Vec<FloatXml>,
    #[serde(default)]
    denominator: Vec<FloatXml>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "PascalCase")]
struct FirXml {
    input_units: UnitsXml,
    output_units: UnitsXml,
    symmetry: String,
    #[serde(default)]
    numerator_coefficient: Vec<FloatXml>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "PascalCase")]
struct ResponseListXml {
    input_units: UnitsXml,
    output_units: UnitsXml,
    #[serde(default)]
    response_list_element: Vec<ResponseListElementXml>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "PascalCase")]
struct ResponseListElementXml {
    frequency: FloatXml,
    amplitude: FloatXml,
    phase: FloatXml,
}

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "PascalCase")]
struct DecimationXml {
    input_sample_rate: FloatXml,
    factor: u32,
    offset: u32,
    delay: FloatXml,
    correction: FloatXml,
}

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "PascalCase")]
struct GainXml {
    value: f64,
    frequency: f64,
}

fn parse_optional_date(value: &Option<String>) -> ExplorerResult<Option<DateTime<Utc>>> {
    value.as_deref().map(parse_datetime).transpose()
}

fn format_date(value: &Option<DateTime<Utc>>) -> Option<String> {
    value.map(|t| t.to_rfc3339_opts(SecondsFormat::Micros, true))
}

fn epoch(start: &Option<String>, end: &Option<String>) -> ExplorerResult<Epoch> {
    Ok(Epoch::new(parse_optional_date(start)?, parse_optional_date(end)?))
}

fn pz_transfer_function(value: &str) -> ExplorerResult<PzTransferFunction> {
    match value.trim().to_ascii_uppercase().as_str() {
        "LAPLACE (RADIANS/SECOND)" => Ok(PzTransferFunction::LaplaceRadians),
        "LAPLACE (HERTZ)" => Ok(PzTransferFunction::LaplaceHertz),
        "DIGITAL (Z-TRANSFORM)" => Ok(PzTransferFunction::DigitalZ),
        other => Err(ExplorerError::Format(format!(
            "unknown PzTransferFunctionType '{other}'"
        ))),
    }
}

fn pz_transfer_function_name(value: PzTransferFunction) -> &'static str {
    match value {
        PzTransferFunction::LaplaceRadians => "LAPLACE (RADIANS/SECOND)",
        PzTransferFunction::LaplaceHertz => "LAPLACE (HERTZ)",
        PzTransferFunction::DigitalZ => "DIGITAL (Z-TRANSFORM)",
    }
}

fn fir_symmetry(value: &str) -> ExplorerResult<FirSymmetry> {
    match value.trim().to_ascii_uppercase().as_str() {
        "NONE" => Ok(FirSymmetry::None),
        "EVEN" => Ok(FirSymmetry::Even),
        "ODD" => Ok(FirSymmetry::Odd),
        other => Err(ExplorerError::Format(format!("unknown FIR symmetry '{other}'"))),
    }
}

fn complex(values: &[PoleZeroXml]) -> Vec<Complex64> {
    values
        .iter()
        .map(|pz| Complex64::new(pz.real.value, pz.imaginary.value))
        .collect()
}

fn values(values: &[FloatXml]) -> Vec<f64> {
    values.iter().map(|v| v.value).collect()
}

fn stage_from_xml(stage: &StageXml, previous_output: &str) -> ExplorerResult<ResponseStage> {
    let (kind, input_units, output_units) = if let Some(pz) = &stage.poles_zeros {
        (
            StageKind::PolesZeros {
                transfer_function: pz_transfer_function(&pz.pz_transfer_function_type)?,
                normalization_factor: pz.normalization_factor,
                normalization_frequency: pz.normalization_frequency.value,
                zeros: complex(&pz.zero),
                poles: complex(&pz.pole),
            },
            pz.input_units.name.as_str(),
            pz.output_units.name.as_str(),
        )
    } else if let Some(cf) = &stage.coefficients {
        (
            StageKind::Coefficients {
                numerators: values(&cf.numerator),
                denominators: values(&cf.denominator),
            },
            cf.input_units.name.as_str(),
            cf.output_units.name.as_str(),
        )
    } else if let Some(fir) = &stage.fir {
        (
            StageKind::Fir {
                symmetry: fir_symmetry(&fir.symmetry)?,
                coefficients: values(&fir.numerator_coefficient),
            },
            fir.input_units.name.as_str(),
            fir.output_units.name.as_str(),
        )
    } else if let Some(list) = &stage.response_list {
        (
            StageKind::ResponseList {
                frequencies: list
                    .response_list_element
                    .iter()
                    .map(|e| e.frequency.value)
                    .collect(),
                amplitudes: list
                    .response_list_element
                    .iter()
                    .map(|e| e.amplitude.value)
                    .collect(),
                phases: list
                    .response_list_element
                    .iter()
                    .map(|e| e.phase.value)
                    .collect(),
            },
            list.input_units.name.as_str(),
            list.output_units.name.as_str(),
        )
    } else if stage.polynomial.is_some() {
        return Err(ExplorerError::Format(format!(
            "stage {} is a Polynomial stage, which is not supported",
            stage.number
        )));
    } else {
        (StageKind::Gain, previous_output, previous_output)
    };
    let (gain, gain_frequency) = stage
        .stage_gain
        .as_ref()
        .map(|g| (g.value, g.frequency))
        .unwrap_or((1.0, 0.0));
    Ok(ResponseStage {
        number: stage.number,
        input_units: input_units.to_string(),
        output_units: output_units.to_string(),
        kind,
        gain,
        gain_frequency,
        decimation: stage.decimation.as_ref().map(|d| Decimation {
            input_sample_rate: d.input_sample_rate.value,
            factor: d.factor,
            offset: d.offset,
            delay: d.delay.value,
            correction: d.correction.value,
        }),
    })
}

fn response_from_xml(xml: &ResponseXml) -> ExplorerResult<Response> {
    let mut stages = Vec::with_capacity(xml.stage.len());
    let mut previous_output = String::new();
    for stage in &xml.stage {
        let converted = stage_from_xml(stage, &previous_output)?;
        previous_output = converted.output_units.clone();
        stages.push(converted);
    }
    Ok(Response {
        instrument_sensitivity: xml
            .instrument_sensitivity
            .as_ref()
            .map(|s| InstrumentSensitivity {
                value: s.value,
                frequency: s.frequency,
                input_units: s.input_units.name.clone(),
                output_units: s.output_units.name.clone(),
            }),
        stages,
    })
}

fn channel_from_xml(xml: &ChannelXml) -> ExplorerResult<Channel> {
    let response = match &xml.response {
        Some(r) if r.stage.iter().any(|s| s.polynomial.is_some()) => {
            warn!(
                "dropping response of channel {}.{} with a Polynomial stage",
                xml.location_code, xml.code
            );
            None
        }
        Some(r) => Some(response_from_xml(r)?),
        None => None,
    };
    Ok(Channel {
        code: xml.code.clone(),
        location_code: xml.location_code.trim().to_string(),
        latitude: xml.latitude.value,
        longitude: xml.longitude.value,
        elevation: xml.elevation.value,
        depth: xml.depth.value,
        azimuth: xml.azimuth.map(|v| v.value),
        dip: xml.dip.map(|v| v.value),
        sample_rate: xml.sample_rate.map(|v| v.value),
        sensor_description: xml.sensor.as_ref().and_then(|s| s.description.clone()),
        epoch: epoch(&xml.start_date, &xml.end_date)?,
        response,
    })
}

fn inventory_from_xml(xml: &StationXml) -> ExplorerResult<Inventory> {
    let networks = xml
        .network
        .iter()
        .map(|net| {
            let stations = net
                .station
                .iter()
                .map(|sta| {
                    Ok(Station {
                        code: sta.code.clone(),
                        site_name: sta.site.as_ref().map(|s| s.name.clone()),
                        latitude: sta.latitude.value,
                        longitude: sta.longitude.value,
                        elevation: sta.elevation.value,
                        epoch: epoch(&sta.start_date, &sta.end_date)?,
                        channels: sta
                            .channel
                            .iter()
                            .map(channel_from_xml)
                            .collect::<ExplorerResult<Vec<Channel>>>()?,
                    })
                })
                .collect::<ExplorerResult<Vec<Station>>>()?;
            Ok(Network {
                code: net.code.clone(),
                description: net.description.clone(),
                epoch: epoch(&net.start_date, &net.end_date)?,
                stations,
            })
        })
        .collect::<ExplorerResult<Vec<Network>>>()?;
    Ok(Inventory {
        source: Some(xml.source.clone()).filter(|s| !s.is_empty()),
        sender: xml.sender.clone(),
        created: parse_optional_date(&xml.created)?,
        networks,
    })
}

fn stage_to_xml(stage: &ResponseStage) -> StageXml {
    let units = || {
        (
            UnitsXml::new(&stage.input_units),
            UnitsXml::new(&stage.output_units),
        )
    };
    let mut xml = StageXml {
        number: stage.number,
        stage_gain: Some(GainXml {
            value: stage.gain,
            frequency: stage.gain_frequency,
        }),
        decimation: stage.decimation.as_ref().map(|d| DecimationXml {
            input_sample_rate: d.input_sample_rate.into(),
            factor: d.factor,
            offset: d.offset,
            delay: d.delay.into(),
            correction: d.correction.into(),
        }),
        ..Default::default()
    };
    match &stage.kind {
        StageKind::PolesZeros {
            transfer_function,
            normalization_factor,
            normalization_frequency,
            zeros,
            poles,
        } => {
            let (input_units, output_units) = units();
            let to_xml = |values: &[Complex64]| {
                values
                    .iter()
                    .enumerate()
                    .map(|(i, c)| PoleZeroXml {
                        number: i as u32,
                        real: c.re.into(),
                        imaginary: c.im.into(),
                    })
                    .collect()
            };
            xml.poles_zeros = Some(PolesZerosXml {
                input_units,
                output_units,
                pz_transfer_function_type: pz_transfer_function_name(*transfer_function)
                    .to_string(),
                normalization_factor: *normalization_factor,
                normalization_frequency: (*normalization_frequency).into(),
                zero: to_xml(zeros),
                pole: to_xml(poles),
            });
        }
        StageKind::Coefficients {
            numerators,
            denominators,
        } => {
            let (input_units, output_units) = units();
            xml.coefficients = Some(CoefficientsXml {
                input_units,
                output_units,
                cf_transfer_function_type: "DIGITAL".to_string(),
                numerator: numerators.iter().map(|&v| v.into()).collect(),
                denominator: denominators.iter().map(|&v| v.into()).collect(),
            });
        }
        StageKind::Fir {
            symmetry,
            coefficients,
        } => {
            let (input_units, output_units) = units();
            xml.fir = Some(FirXml {
                input_units,
                output_units,
                symmetry: match symmetry {
                    FirSymmetry::None => "NONE",
                    FirSymmetry::Even => "EVEN",
                    FirSymmetry::Odd => "ODD",
                }
                .to_string(),
                numerator_coefficient: coefficients.iter().map(|&v| v.into()).collect(),
            });
        }
        StageKind::ResponseList {
            frequencies,
            amplitudes,
            phases,
        } => {
            let (input_units, output_units) = units();
            xml.response_list = Some(ResponseListXml {
                input_units,
                output_units,
                response_list_element: frequencies
                    .iter()
                    .zip(amplitudes)
                    .zip(phases)
                    .map(|((&f, &a), &p)| ResponseListElementXml {
                        frequency: f.into(),
                        amplitude: a.into(),
                        phase: p.into(),
                    })
                    .collect(),
            });
        }
        StageKind::Gain => {}
    }
    xml
}

fn channel_to_xml(channel: &Channel) -> ChannelXml {
    ChannelXml {
        code: channel.code.clone(),
        location_code: channel.location_code.clone(),
        start_date: format_date(&channel.epoch.start),
        end_date: format_date(&channel.epoch.end),
        latitude: channel.latitude.into(),
        longitude: channel.longitude.into(),
        elevation: channel.elevation.into(),
        depth: channel.depth.into(),
        azimuth: channel.azimuth.map(FloatXml::from),
        dip: channel.dip.map(FloatXml::from),
        sample_rate: channel.sample_rate.map(FloatXml::from),
        sensor: channel.sensor_description.as_ref().map(|d| SensorXml {
            description: Some(d.clone()),
        }),
        response: channel.response.as_ref().map(|r| ResponseXml {
            instrument_sensitivity: r.instrument_sensitivity.as_ref().map(|s| SensitivityXml {
                value: s.value,
                frequency: s.frequency,
                input_units: UnitsXml::new(&s.input_units),
                output_units: UnitsXml::new(&s.output_units),
            }),
            stage: r.stages.iter().map(stage_to_xml).collect(),
        }),
    }
}

fn inventory_to_xml(inventory: &Inventory) -> StationXml {
    StationXml {
        xmlns: Some(NAMESPACE.to_string()),
        schema_version: Some(SCHEMA_VERSION.to_string()),
        source: inventory
            .source
            .clone()
            .unwrap_or_else(|| "seismo-explorer".to_string()),
        sender: inventory.sender.clone(),
        module: Some(format!("seismo-explorer {}", env!("CARGO_PKG_VERSION"))),
        created: format_date(&Some(inventory.created.unwrap_or_else(Utc::now))),
        network: inventory
            .networks
            .iter()
            .map(|net| NetworkXml {
                code: net.code.clone(),
                start_date: format_date(&net.epoch.start),
                end_date: format_date(&net.epoch.end),
                description: net.description.clone(),
                station: net
                    .stations
                    .iter()
                    .map(|sta| StationXmlElement {
                        code: sta.code.clone(),
                        start_date: format_date(&sta.epoch.start),
                        end_date: format_date(&sta.epoch.end),
                        latitude: sta.latitude.into(),
                        longitude: sta.longitude.into(),
                        elevation: sta.elevation.into(),
                        site: sta.site_name.as_ref().map(|name| SiteXml { name: name.clone() }),
                        channel: sta.channels.iter().map(channel_to_xml).collect(),
                    })
                    .collect(),
            })
            .collect(),
    }
}

/// Parses a StationXML document and checks the channel epochs.
pub fn read_from_str(xml: &str) -> ExplorerResult<Inventory> {
    let document: StationXml = quick_xml::de::from_str(xml)
        .map_err(|e| ExplorerError::Format(format!("invalid StationXML: {e}")))?;
    let inventory = inventory_from_xml(&document)?;
    inventory.validate()?;
    debug!(
        "parsed StationXML with {} networks, {} stations, {} channels",
        inventory.network_count(),
        inventory.station_count(),
        inventory.channel_count()
    );
    Ok(inventory)
}

/// Serializes an inventory as a StationXML 1.1 document.
pub fn write_to_string(inventory: &Inventory) -> ExplorerResult<String> {
    let body = quick_xml::se::to_string(&inventory_to_xml(inventory))
        .map_err(|e| ExplorerError::Format(format!("cannot serialize StationXML: {e}")))?;
    Ok(format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{body}"))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::data_container::TraceId;
    use crate::response::tests::geophone_response;
    use chrono::TimeZone;

    pub(crate) const AXAS1_CHANNELS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<FDSNStationXML xmlns="http://www.fdsn.org/xml/station/1" schemaVersion="1.1">
  <Source>IRIS-DMC</Source>
  <Sender>IRIS-DMC</Sender>
  <Created>2023-05-02T10:15:00.0000</Created>
  <Network code="OO" startDate="2014-01-01T00:00:00.0000" restrictedStatus="open">
    <Description>Ocean Observatories Initiative</Description>
    <Station code="AXAS1" startDate="2015-01-01T00:00:00.0000">
      <Latitude unit="DEGREES">45.933586</Latitude>
      <Longitude unit="DEGREES">-129.99918</Longitude>
      <Elevation unit="METERS">-1529.0</Elevation>
      <Site>
        <Name>Axial Base Shallow Profiler Mooring</Name>
      </Site>
      <Channel code="EHZ" locationCode="" startDate="2015-01-01T00:00:00.0000">
        <Latitude>45.933586</Latitude>
        <Longitude>-129.99918</Longitude>
        <Elevation>-1529.0</Elevation>
        <Depth>0.0</Depth>
        <Azimuth>0.0</Azimuth>
        <Dip>-90.0</Dip>
        <Type>CONTINUOUS</Type>
        <SampleRate>200.0</SampleRate>
        <Sensor>
          <Description>Geospace HS-1</Description>
        </Sensor>
      </Channel>
    </Station>
  </Network>
</FDSNStationXML>
"#;

    #[test]
    fn test_read_channel_level() {
        let inventory = read_from_str(AXAS1_CHANNELS).unwrap();
        assert_eq!(inventory.station_count(), 1);
        assert_eq!(inventory.channel_count(), 1);
        assert_eq!(inventory.response_count(), 0);
        let net = &inventory.networks[0];
        assert_eq!(net.description.as_deref(), Some("Ocean Observatories Initiative"));
        let sta = &net.stations[0];
        assert_eq!(sta.site_name.as_deref(), Some("Axial Base Shallow Profiler Mooring"));
        let cha = &sta.channels[0];
        assert_eq!(cha.location_code, "");
        assert_eq!(cha.sample_rate, Some(200.0));
        assert_eq!(cha.dip, Some(-90.0));
        assert_eq!(
            cha.epoch.start,
            Some(Utc.with_ymd_and_hms(2015, 1, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_round_trip_with_response() {
        let mut inventory = read_from_str(AXAS1_CHANNELS).unwrap();
        inventory.networks[0].stations[0].channels[0].response = Some(geophone_response());
        let xml = write_to_string(&inventory).unwrap();
        assert!(xml.contains("LAPLACE (RADIANS/SECOND)"));
        let back = read_from_str(&xml).unwrap();
        assert_eq!(back.networks, inventory.networks);
        let id = TraceId::new("OO", "AXAS1", "", "EHZ");
        let t = Utc.with_ymd_and_hms(2019, 11, 1, 0, 0, 0).unwrap();
        assert_eq!(back.get_response(&id, &t), Some(&geophone_response()));
    }

    #[test]
    fn test_empty_document() {
        let xml = r#"<FDSNStationXML schemaVersion="1.1"><Source>X</Source></FDSNStationXML>"#;
        assert!(read_from_str(xml).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_document() {
        assert!(matches!(
            read_from_str("<FDSNStationXML><Network code=\"OO\">"),
            Err(ExplorerError::Format(_))
        ));
        let bad_date = AXAS1_CHANNELS.replace(
            "2015-01-01T00:00:00.0000\">\n        <Latitude>",
            "soon\">\n        <Latitude>",
        );
        assert!(matches!(
            read_from_str(&bad_date),
            Err(ExplorerError::Format(_))
        ));
    }
}
